//! Registry configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSON file holding the vehicle list
    pub path: PathBuf,

    /// Same-label detections closer than this reuse an id (pixels)
    pub match_radius: f64,

    /// Minimum time between automatic saves while dirty (seconds)
    pub autosave_interval_s: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/vehicles.json"),
            match_radius: 500.0,
            autosave_interval_s: 60.0,
        }
    }
}
