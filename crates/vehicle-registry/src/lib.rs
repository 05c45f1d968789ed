//! Vehicle Registry
//!
//! Keeps stable identities for site vehicles across frames and restarts.
//! Detections are matched to the nearest known vehicle of the same label;
//! anything outside the match radius becomes a new vehicle with a runtime id.
//! The registry is persisted as a JSON array of records.

pub mod config;
pub mod record;
mod registry;

pub use config::RegistryConfig;
pub use record::{VehicleId, VehicleRecord, VehicleStatus};
pub use registry::{VehicleRegistry, RUNTIME_ID_START};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Registry has no backing file")]
    NoPath,
}
