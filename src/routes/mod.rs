//! Route definitions for the ScanHub API.

pub mod api_keys;
pub mod auth;
pub mod health;
pub mod jobs;
pub mod memberships;
pub mod projects;
pub mod scan_configs;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        // Auth
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/users", post(auth::create_user))
        .route("/api/v1/auth/me", get(auth::me))
        // Projects
        .route("/api/v1/projects", get(projects::list).post(projects::create))
        .route(
            "/api/v1/projects/{id}",
            get(projects::get_by_id)
                .put(projects::update)
                .delete(projects::delete),
        )
        // Memberships
        .route(
            "/api/v1/memberships",
            get(memberships::list).post(memberships::create),
        )
        .route(
            "/api/v1/memberships/{id}",
            put(memberships::update).delete(memberships::delete),
        )
        // Scan configurations
        .route(
            "/api/v1/scan-configurations",
            get(scan_configs::list).post(scan_configs::create),
        )
        .route(
            "/api/v1/scan-configurations/{id}",
            get(scan_configs::get_by_id)
                .put(scan_configs::update)
                .delete(scan_configs::delete),
        )
        // API keys
        .route("/api/v1/api-keys", get(api_keys::list).post(api_keys::create))
        .route("/api/v1/api-keys/{id}", delete(api_keys::revoke))
        // Scan jobs
        .route("/api/v1/scan-jobs", get(jobs::list).post(jobs::create))
        .route("/api/v1/scan-jobs/{id}", get(jobs::get_by_id))
        .route("/api/v1/scan-jobs/{id}/dispatch", post(jobs::dispatch))
        .route("/api/v1/ci/scan-jobs", post(jobs::create_from_ci))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
