//! Project routes: CRUD, visibility-filtered.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::services::projects as project_service;
use crate::AppState;

/// GET /api/v1/projects — list projects visible to the caller.
pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<PagedResult<Project>>>, AppError> {
    let result =
        project_service::list(&state.db, &current_user.principal(), &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/projects — create a project; the caller becomes owner and
/// gets a manager membership.
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CreateProject>,
) -> Result<Json<ApiResponse<Project>>, AppError> {
    let project =
        project_service::create(&state.db, &current_user.principal(), &body).await?;
    Ok(ApiResponse::success(project))
}

/// GET /api/v1/projects/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Project>>, AppError> {
    let project = project_service::get(&state.db, &current_user.principal(), id).await?;
    Ok(ApiResponse::success(project))
}

/// PUT /api/v1/projects/:id — update metadata (manager+).
pub async fn update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProject>,
) -> Result<Json<ApiResponse<Project>>, AppError> {
    let project =
        project_service::update(&state.db, &current_user.principal(), id, &body).await?;
    Ok(ApiResponse::success(project))
}

/// DELETE /api/v1/projects/:id — owner or superuser only.
pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    project_service::delete(&state.db, &current_user.principal(), id).await?;
    Ok(ApiResponse::success("Project deleted"))
}
