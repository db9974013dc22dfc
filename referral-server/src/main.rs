//! referral-server 入口

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use referral_server::utils::logger;
use referral_server::{AppState, BackgroundTasks, Config, api};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    logger::init_logger_with_file(&config.log_level, config.log_dir.as_deref());
    config.log_warnings();

    tracing::info!(
        "Starting referral-server (env: {}, db: {})",
        config.environment,
        config.database_path
    );

    let state = AppState::new(&config).await?;

    let mut tasks = BackgroundTasks::new();
    state.start_background_tasks(&mut tasks);
    if let Some(dir) = config.log_dir.clone() {
        tasks.spawn_periodic("log_cleanup", Duration::from_secs(24 * 60 * 60), move || {
            let dir = dir.clone();
            async move {
                if let Err(e) = logger::cleanup_old_logs(Path::new(&dir), logger::LOG_RETENTION_DAYS) {
                    tracing::warn!("Log cleanup failed: {e}");
                }
            }
        });
    }
    tasks.log_summary();

    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("referral-server HTTP listening on {addr}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks.shutdown().await;
    tracing::info!("referral-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("Shutdown signal received");
}
