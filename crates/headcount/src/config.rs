//! Headcount configuration

use serde::{Deserialize, Serialize};

/// Headcount monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadcountConfig {
    /// Number of people expected on site
    pub expected_count: u32,

    /// How often a mismatch check runs (seconds)
    pub check_interval_s: f64,

    /// Sample retention window for the mode (seconds)
    pub sample_window_s: f64,

    /// Minimum time between two surfaced mismatch alerts (seconds)
    pub alert_cooldown_s: f64,
}

impl Default for HeadcountConfig {
    fn default() -> Self {
        Self {
            expected_count: 0,
            check_interval_s: 300.0,  // 5 minutes
            sample_window_s: 300.0,   // 5 minutes
            alert_cooldown_s: 600.0,  // 10 minutes
        }
    }
}
