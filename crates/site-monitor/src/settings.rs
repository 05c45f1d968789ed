//! Site settings
//!
//! Layered from built-in defaults, an optional config file and `SITEOPS_*`
//! environment variables (`__` separates nested keys, e.g.
//! `SITEOPS_PROXIMITY__PIXEL_THRESHOLD=250`).

use std::path::{Path, PathBuf};

use alerting::AlertConfig;
use config::{Config, Environment, File};
use fall_detection::FallConfig;
use headcount::HeadcountConfig;
use proximity::ProximityConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use vehicle_registry::RegistryConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SITEOPS";

/// Environment variable naming the config file
pub const CONFIG_PATH_VAR: &str = "SITEOPS_CONFIG";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Config error: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address for the event API
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// NDJSON frame file; stdin when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub proximity: ProximityConfig,
    pub fall: FallConfig,
    pub headcount: HeadcountConfig,
    pub registry: RegistryConfig,
    pub alerts: AlertConfig,
    pub server: ServerSettings,
    pub feed: FeedSettings,
    pub logging: LoggingSettings,
}

impl SiteSettings {
    /// Load defaults, then `path` if given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        Self::load_with_env(path, env)
    }

    /// Same as [`SiteSettings::load`] with an explicit environment source
    pub fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!("Loading settings from {}", path.display());
            builder = builder.add_source(File::from(path));
        }

        let settings: SiteSettings = builder.add_source(env).build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the trackers cannot work with
    pub fn validate(&self) -> Result<(), SettingsError> {
        positive("proximity.pixel_threshold", self.proximity.pixel_threshold)?;
        non_negative("proximity.min_duration_s", self.proximity.min_duration_s)?;
        non_negative("proximity.cooldown_s", self.proximity.cooldown_s)?;
        positive("fall.aspect_ratio_threshold", self.fall.aspect_ratio_threshold)?;
        non_negative("fall.min_duration_s", self.fall.min_duration_s)?;
        non_negative("fall.cooldown_s", self.fall.cooldown_s)?;
        positive("headcount.check_interval_s", self.headcount.check_interval_s)?;
        positive("headcount.sample_window_s", self.headcount.sample_window_s)?;
        non_negative("headcount.alert_cooldown_s", self.headcount.alert_cooldown_s)?;
        positive("registry.match_radius", self.registry.match_radius)?;
        non_negative("registry.autosave_interval_s", self.registry.autosave_interval_s)?;
        Ok(())
    }
}

fn positive(key: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::Invalid {
            key,
            reason: format!("must be positive, got {}", value),
        })
    }
}

fn non_negative(key: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::Invalid {
            key,
            reason: format!("must not be negative, got {}", value),
        })
    }
}
