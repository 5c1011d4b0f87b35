//! Authentication extractor for Axum handlers.
//!
//! Accepts either a JWT Bearer token (interactive users) or an `X-API-Key`
//! header (CI callers). Once the credential is validated both arrive at the
//! same [`CurrentUser`]; the authorization gate does not care which.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::access::Principal;
use crate::services::{api_keys, auth as auth_service};
use crate::AppState;

/// Authenticated principal extracted from the request credentials.
///
/// Use as an Axum extractor in handlers that require authentication:
/// ```ignore
/// async fn handler(current_user: CurrentUser) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub is_superuser: bool,
    /// True when the request was authenticated via API key (CI caller).
    pub via_api_key: bool,
}

impl CurrentUser {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            is_superuser: self.is_superuser,
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // API key takes precedence when present: CI callers do not carry
        // session tokens.
        if let Some(key) = parts.headers.get("X-API-Key").and_then(|v| v.to_str().ok()) {
            let (user, _key) = api_keys::authenticate(&state.db, key).await?;
            return Ok(CurrentUser {
                id: user.id,
                username: user.username,
                is_superuser: user.is_superuser,
                via_api_key: true,
            });
        }

        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let claims = auth_service::validate_token(token, &state.config.jwt_secret)?;

        if claims.token_type != "access" {
            return Err(AppError::Unauthorized);
        }

        let user_id: Uuid = claims
            .user_id
            .parse()
            .map_err(|_| AppError::Unauthorized)?;

        Ok(CurrentUser {
            id: user_id,
            username: claims.sub,
            is_superuser: claims.is_superuser,
            via_api_key: false,
        })
    }
}
