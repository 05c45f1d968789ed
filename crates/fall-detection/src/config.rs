//! Fall detection configuration

use serde::{Deserialize, Serialize};

/// Fall detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallConfig {
    /// Run the fall tracker at all
    pub enabled: bool,

    /// A box is "lying" when height/width < 1 / aspect_ratio_threshold
    pub aspect_ratio_threshold: f64,

    /// Time a person must stay down before alerting (seconds)
    pub min_duration_s: f64,

    /// Re-alert guard and recovery debounce window (seconds)
    pub cooldown_s: f64,
}

impl Default for FallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            aspect_ratio_threshold: 1.5,
            min_duration_s: 1.5,
            cooldown_s: 10.0,
        }
    }
}

impl FallConfig {
    /// Aspect ratio (height/width) below which a box counts as lying
    pub fn lying_ratio(&self) -> f64 {
        1.0 / self.aspect_ratio_threshold
    }
}
