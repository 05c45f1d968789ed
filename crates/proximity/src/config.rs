//! Proximity configuration

use serde::{Deserialize, Serialize};

/// Proximity tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Center-to-center distance at or below which a pair is "too close" (pixels)
    pub pixel_threshold: f64,

    /// Time a pair must stay close before the first warning (seconds)
    pub min_duration_s: f64,

    /// Minimum time between two warnings for the same pair (seconds)
    pub cooldown_s: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            pixel_threshold: 200.0,
            min_duration_s: 2.0,
            cooldown_s: 5.0,
        }
    }
}
