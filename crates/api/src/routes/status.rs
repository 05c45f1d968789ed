//! Service status routes

use axum::{extract::State, Json};
use serde::Serialize;

use alerting::AlertRecord;
use headcount::HeadcountStats;

use crate::{ApiError, SharedState, SERVICE_NAME};

/// Events included in `/status`
const STATUS_RECENT_EVENTS: usize = 10;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Live WebSocket subscribers
    pub connections: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    pub websocket_connections: usize,
    pub frames_processed: u64,
    pub headcount: Option<HeadcountStats>,
    pub recent_events: Vec<AlertRecord>,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "ok",
        service: SERVICE_NAME,
    })
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let state = state.read().await;
    Json(HealthResponse {
        status: "healthy",
        connections: state.alerts.subscriber_count(),
    })
}

pub async fn status(State(state): State<SharedState>) -> Result<Json<StatusResponse>, ApiError> {
    let state = state.read().await;
    Ok(Json(StatusResponse {
        status: if state.running { "running" } else { "idle" },
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        websocket_connections: state.alerts.subscriber_count(),
        frames_processed: state.frames_processed,
        headcount: state.headcount.clone(),
        recent_events: state.alerts.recent(STATUS_RECENT_EVENTS)?,
    }))
}
