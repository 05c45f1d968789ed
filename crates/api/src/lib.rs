//! SiteOps Safety API Server
//!
//! HTTP status endpoints and a WebSocket stream of live alerts, plus the
//! async feed loop that drives the site monitor.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use alerting::{AlertError, AlertManager};
use headcount::HeadcountStats;

mod feed;
mod routes;

pub use feed::{run_feed, FeedSummary};

/// Service name reported by `/`
pub const SERVICE_NAME: &str = "SiteOps Safety API";

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Alert error: {0}")]
    Alert(#[from] AlertError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid log level: {0}")]
    LogLevel(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Alert sink shared with the frame loop
    pub alerts: Arc<AlertManager>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Frame loop still consuming the feed
    pub running: bool,
    pub frames_processed: u64,
    /// Latest headcount statistics from the monitor
    pub headcount: Option<HeadcountStats>,
}

impl AppState {
    /// Create new application state
    pub fn new(alerts: Arc<AlertManager>) -> Self {
        Self {
            alerts,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            running: false,
            frames_processed: 0,
            headcount: None,
        }
    }
}

pub type SharedState = Arc<RwLock<AppState>>;

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(routes::status::root))
        .route("/healthz", get(routes::status::health))
        .route("/status", get(routes::status::status))
        .route("/api/v1/alerts", get(routes::alerts::get_alerts))
        .route("/events", get(routes::events::events_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(level: &str, json: bool) -> Result<(), ApiError> {
    let level: Level = level
        .parse()
        .map_err(|_| ApiError::LogLevel(level.to_string()))?;

    let result = if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    result.map_err(|e| ApiError::Logging(e.to_string()))
}

/// Serve the API on an already bound listener until `shutdown` resolves
pub async fn run_server(
    listener: tokio::net::TcpListener,
    state: SharedState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ApiError> {
    let app = create_router(state);

    info!("Starting API server on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("API server stopped");
    Ok(())
}
