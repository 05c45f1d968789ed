//! Pairwise Proximity Tracking
//!
//! Watches every (person, vehicle) pair in view and raises a warning when a
//! person stays within a pixel radius of a vehicle for long enough:
//! - Duration gating (the pair must stay close for `min_duration_s`)
//! - Per-pair cooldown between repeat warnings
//! - Reset on the first frame the pair separates
//! - State cleanup as soon as either entity leaves the frame
//!
//! Distance is the 2-D Euclidean distance between centers in image space.

pub mod config;
pub mod state;
mod tracker;

pub use config::ProximityConfig;
pub use state::{ClosePair, PairKey, PairState, ProximityAlert};
pub use tracker::ProximityTracker;
