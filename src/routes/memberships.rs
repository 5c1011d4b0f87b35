//! Membership routes: list, add, change role, remove.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::membership::{
    CreateMembership, Membership, MembershipWithUser, UpdateMembership,
};
use crate::services::memberships as membership_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MembershipListQuery {
    pub project_id: Uuid,
}

/// GET /api/v1/memberships?project_id=... — list a project's members.
pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<MembershipListQuery>,
) -> Result<Json<ApiResponse<Vec<MembershipWithUser>>>, AppError> {
    let members = membership_service::list_for_project(
        &state.db,
        &current_user.principal(),
        query.project_id,
    )
    .await?;
    Ok(ApiResponse::success(members))
}

/// POST /api/v1/memberships — add a member (manager+).
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CreateMembership>,
) -> Result<Json<ApiResponse<Membership>>, AppError> {
    let membership =
        membership_service::add_member(&state.db, &current_user.principal(), &body).await?;
    Ok(ApiResponse::success(membership))
}

/// PUT /api/v1/memberships/:id — change a member's role (manager+).
pub async fn update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMembership>,
) -> Result<Json<ApiResponse<Membership>>, AppError> {
    let membership =
        membership_service::change_role(&state.db, &current_user.principal(), id, body.role)
            .await?;
    Ok(ApiResponse::success(membership))
}

/// DELETE /api/v1/memberships/:id — remove a member (manager+).
pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    membership_service::remove_member(&state.db, &current_user.principal(), id).await?;
    Ok(ApiResponse::success("Membership removed"))
}
