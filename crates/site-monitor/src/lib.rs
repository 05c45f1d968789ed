//! Site Safety Monitor
//!
//! Ties the trackers together for a single camera stream:
//! - Proximity warnings between people and vehicles
//! - Fall (person down) detection
//! - Headcount checks against the expected number of people
//! - Stable vehicle identities from the persistent registry
//!
//! Frames arrive as NDJSON [`FrameInput`] lines; alerts leave through an
//! [`alerting::AlertSink`].

mod frame;
mod monitor;
pub mod settings;

pub use frame::{FrameFeed, FrameInput};
pub use monitor::{FrameReport, SiteMonitor};
pub use settings::{SettingsError, SiteSettings};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Registry error: {0}")]
    Registry(#[from] vehicle_registry::RegistryError),

    #[error("Alert error: {0}")]
    Alert(#[from] alerting::AlertError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad frame on line {line}: {source}")]
    Feed {
        line: usize,
        source: serde_json::Error,
    },
}
