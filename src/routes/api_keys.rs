//! API key routes. The plaintext key appears only in the creation response.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::api_key::{ApiKeyResponse, CreateApiKey, CreatedApiKey};
use crate::services::api_keys as api_key_service;
use crate::AppState;

/// GET /api/v1/api-keys — list the caller's own keys.
pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<ApiKeyResponse>>>, AppError> {
    let keys = api_key_service::list_for_user(&state.db, current_user.id).await?;
    Ok(ApiResponse::success(keys))
}

/// POST /api/v1/api-keys — create a key for the caller.
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CreateApiKey>,
) -> Result<Json<ApiResponse<CreatedApiKey>>, AppError> {
    let created = api_key_service::create(&state.db, current_user.id, &body).await?;
    Ok(ApiResponse::success(created))
}

/// DELETE /api/v1/api-keys/:id — revoke (deactivate) a key.
pub async fn revoke(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    api_key_service::revoke(&state.db, id, current_user.id, current_user.is_superuser).await?;
    Ok(ApiResponse::success("API key revoked"))
}
