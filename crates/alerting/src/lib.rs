//! Alerting System
//!
//! Receives alerts raised by the trackers and:
//! - Appends them to an NDJSON event log
//! - Keeps a bounded cache of recent events
//! - Broadcasts them to live subscribers without blocking the frame path

mod log;
mod manager;
mod record;

pub use log::{EventLog, EVENT_LOG_FILE};
pub use manager::{AlertConfig, AlertManager};
pub use record::{AlertKind, AlertRecord, Severity};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock error: {0}")]
    Lock(String),
}

/// Destination for alert records
pub trait AlertSink: Send + Sync {
    fn deliver(&self, record: &AlertRecord) -> Result<(), AlertError>;
}
