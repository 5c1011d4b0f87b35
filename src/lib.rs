pub mod config;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use sqlx::PgPool;

use services::dispatch::TaskDispatcher;

/// Shared application state passed to all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: config::AppConfig,
    pub dispatcher: Arc<dyn TaskDispatcher>,
}
