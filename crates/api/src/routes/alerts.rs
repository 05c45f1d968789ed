//! Alert Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use alerting::AlertRecord;

use crate::{ApiError, SharedState};

const MAX_LIMIT: usize = 100;

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Maximum number of records (capped at 100)
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    /// Oldest first
    pub data: Vec<AlertRecord>,
    pub count: usize,
}

/// Most recent alerts
pub async fn get_alerts(
    State(state): State<SharedState>,
    Query(params): Query<AlertQuery>,
) -> Result<Json<AlertResponse>, ApiError> {
    let limit = params.limit.min(MAX_LIMIT);
    let data = state.read().await.alerts.recent(limit)?;

    Ok(Json(AlertResponse {
        count: data.len(),
        data,
    }))
}
