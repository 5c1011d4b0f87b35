//! Platform-level access extractors for Axum handlers.
//!
//! Project-scoped authorization goes through `services::access`; the only
//! platform-wide privilege is the superuser flag.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::AppState;

/// Extractor that requires a superuser principal.
#[derive(Debug, Clone)]
pub struct RequireSuperuser(pub CurrentUser);

impl FromRequestParts<AppState> for RequireSuperuser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_superuser {
            return Err(AppError::Forbidden(
                "Superuser access required".to_string(),
            ));
        }
        Ok(RequireSuperuser(user))
    }
}
