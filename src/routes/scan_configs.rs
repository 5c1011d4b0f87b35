//! Scan configuration routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::scan_config::{
    CreateScanConfiguration, ScanConfiguration, UpdateScanConfiguration,
};
use crate::services::scan_configs as config_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfigListQuery {
    pub project_id: Uuid,
}

/// GET /api/v1/scan-configurations?project_id=...
pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ConfigListQuery>,
) -> Result<Json<ApiResponse<Vec<ScanConfiguration>>>, AppError> {
    let configs = config_service::list_for_project(
        &state.db,
        &current_user.principal(),
        query.project_id,
    )
    .await?;
    Ok(ApiResponse::success(configs))
}

/// POST /api/v1/scan-configurations — create (manager+).
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CreateScanConfiguration>,
) -> Result<Json<ApiResponse<ScanConfiguration>>, AppError> {
    let config = config_service::create(&state.db, &current_user.principal(), &body).await?;
    Ok(ApiResponse::success(config))
}

/// GET /api/v1/scan-configurations/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ScanConfiguration>>, AppError> {
    let config = config_service::get(&state.db, &current_user.principal(), id).await?;
    Ok(ApiResponse::success(config))
}

/// PUT /api/v1/scan-configurations/:id — update (manager+). In-flight jobs
/// keep their snapshot.
pub async fn update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateScanConfiguration>,
) -> Result<Json<ApiResponse<ScanConfiguration>>, AppError> {
    let config =
        config_service::update(&state.db, &current_user.principal(), id, &body).await?;
    Ok(ApiResponse::success(config))
}

/// DELETE /api/v1/scan-configurations/:id — delete (manager+). Existing
/// jobs survive with a null configuration reference.
pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    config_service::delete(&state.db, &current_user.principal(), id).await?;
    Ok(ApiResponse::success("Scan configuration deleted"))
}
