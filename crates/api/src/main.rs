use anyhow::Result;
use std::time::Duration;
use tracing::info;

use signal_preemption_api::{app, config, middleware};

const ALERT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!(
        "Starting signal preemption service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_config = persistence::db::DatabaseConfig::from(&config.database);
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let addr = config.socket_addr()?;
    info!(publisher_mode = ?config.publisher.mode, "Alert publisher configured");
    let (app, alert_worker) = app::create_app(config, pool)?;

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Upgraded sockets outlive the server, so close the queue explicitly
    match tokio::time::timeout(ALERT_DRAIN_TIMEOUT, alert_worker.shutdown()).await {
        Ok(Ok(())) => info!("Alert queue drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Alert worker failed"),
        Err(_) => tracing::warn!("Alert queue not drained before shutdown"),
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
