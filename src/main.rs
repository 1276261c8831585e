//! Countdown Keeper - named, categorized countdown timers
//!
//! This is the main entry point for the countdown-keeper server.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use countdown_keeper::{
    api::create_router,
    config::Config,
    services::FileStore,
    state::AppState,
    tasks::spawn_timer_service,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("countdown_keeper={},tower_http=info", config.log_level()))
        .init();

    info!("Starting countdown-keeper v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, data_dir={}, tick={}ms",
          config.host, config.port, config.data_dir.display(), config.tick_ms);

    // The service loads saved timers before it applies any request
    let store = Arc::new(FileStore::new(config.data_dir.clone()));
    let (timers, service_task) = spawn_timer_service(store, config.tick_period());

    let state = Arc::new(AppState::new(timers.clone(), config.port, config.host.clone()));
    let app = create_router(state);

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /timers                - List active and completed timers");
    info!("  POST /timers                - Add a timer");
    info!("  POST /timers/:id/status     - Set status and remaining seconds");
    info!("  POST /timers/:id/start      - Start a timer");
    info!("  POST /timers/:id/pause      - Pause a timer");
    info!("  POST /timers/:id/reset      - Reset a timer");
    info!("  POST /timers/:id/complete   - Complete a timer");
    info!("  GET  /completed             - List completed timers");
    info!("  GET  /status                - Service status");
    info!("  GET  /health                - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shutdown signal received");

    // Cancel every countdown before exiting
    timers.shutdown().await?;
    service_task.await?;

    info!("Server shutdown complete");
    Ok(())
}
