use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use scanhub::config::AppConfig;
use scanhub::services::dispatch::{DispatcherConfig, TokioDispatcher};
use scanhub::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scanhub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration");

    let pool = scanhub::db::create_pool(&config.database_url, config.database_max_connections)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let dispatcher = TokioDispatcher::new(
        pool.clone(),
        DispatcherConfig {
            scan_duration: Duration::from_millis(config.scan_duration_ms),
        },
    );

    let state = AppState {
        db: pool,
        config: config.clone(),
        dispatcher: Arc::new(dispatcher),
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid BACKEND_HOST/BACKEND_PORT");
    tracing::info!(host = %addr, "Starting ScanHub API server");

    let app = scanhub::routes::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
