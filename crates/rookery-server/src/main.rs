use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rookery_core::MemoryStorage;
use rookery_server::routes::spawn_limiter_sweep;
use rookery_server::{AppConfig, AppState, build_router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real deployments configure via file or environment.
    dotenvy::dotenv().ok();

    let config_path = std::env::var("ROOKERY_CONFIG").unwrap_or_else(|_| "rookery".to_string());
    let config = AppConfig::load(&config_path)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    let storage = Arc::new(MemoryStorage::with_default_roles());
    let state = AppState::with_memory_storage(&config, storage);

    // Keep limiter key state bounded: sweep keys idle for ten windows.
    spawn_limiter_sweep(&state, Duration::from_secs(60), 10 * config.window());

    let app = build_router(state);
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "rookery server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
