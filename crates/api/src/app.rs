use axum::{middleware, routing::get, Router};
use domain::services::{AlertPublisher, LoggingAlertPublisher, SignalDirectory};
use persistence::repositories::SignalRepository;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, PublisherMode};
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{health, signals, ws};
use crate::services::{AlertDispatcher, AlertWorker, HttpBridgePublisher, SessionManager};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub sessions: Arc<SessionManager>,
}

/// Builds the alert publisher selected by configuration.
pub fn build_publisher(config: &Config) -> Result<Arc<dyn AlertPublisher>, reqwest::Error> {
    let publisher: Arc<dyn AlertPublisher> = match config.publisher.mode {
        PublisherMode::Log => Arc::new(LoggingAlertPublisher),
        PublisherMode::Http => Arc::new(HttpBridgePublisher::new(&config.publisher)?),
    };
    Ok(publisher)
}

/// Wires the production collaborators: signals from Postgres and the
/// configured publisher. Returns the router and the alert worker handle.
pub fn create_app(
    config: Config,
    pool: PgPool,
) -> Result<(Router, AlertWorker), reqwest::Error> {
    let publisher = build_publisher(&config)?;
    let directory = Arc::new(SignalRepository::new(pool.clone()));
    Ok(create_app_with(config, pool, directory, publisher))
}

/// Builds the router around injected collaborators.
pub fn create_app_with(
    config: Config,
    pool: PgPool,
    directory: Arc<dyn SignalDirectory>,
    publisher: Arc<dyn AlertPublisher>,
) -> (Router, AlertWorker) {
    let config = Arc::new(config);

    let (dispatcher, worker) = AlertDispatcher::spawn(publisher, &config.publisher);
    let sessions = Arc::new(SessionManager::new(
        directory,
        dispatcher,
        config.tracking.thresholds(),
    ));

    let state = AppState {
        pool,
        config: config.clone(),
        sessions,
    };

    (router(state), worker)
}

fn router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Live tracking (long-lived, kept out of the request timeout)
    let tracking_routes = Router::new().route("/ws/location", get(ws::location_socket));

    let api_routes = Router::new()
        .route("/api/v1/signals", get(signals::list_signals))
        .route("/api/v1/signals/nearest", get(signals::nearest_signals))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(tracking_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
