//! Pair state and warnings

use entity::{Point, Timestamp, TrackId};
use serde::{Deserialize, Serialize};

/// Key of a (person, vehicle) relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub person_id: TrackId,
    pub vehicle_id: TrackId,
}

impl PairKey {
    pub fn new(person_id: TrackId, vehicle_id: TrackId) -> Self {
        Self {
            person_id,
            vehicle_id,
        }
    }
}

/// Hysteresis state for one person-vehicle pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairState {
    /// Start of the current uninterrupted close streak
    pub first_close_time: Option<Timestamp>,

    /// Latest frame the pair was close
    pub last_close_time: Option<Timestamp>,

    /// A warning fired during the current close streak
    pub is_alerted: bool,

    /// Latest warning for this pair (survives streak resets)
    pub last_alert_time: Option<Timestamp>,
}

impl PairState {
    /// Time spent close in the current streak
    pub fn close_duration(&self, now: Timestamp) -> Option<f64> {
        self.first_close_time.map(|first| (now - first).max(0.0))
    }

    pub fn is_close(&self) -> bool {
        self.first_close_time.is_some()
    }

    /// Forget the current close streak
    pub fn reset(&mut self) {
        self.first_close_time = None;
        self.last_close_time = None;
        self.is_alerted = false;
    }

    pub(crate) fn cooldown_elapsed(&self, now: Timestamp, cooldown_s: f64) -> bool {
        self.last_alert_time
            .map_or(true, |last| now - last >= cooldown_s)
    }
}

/// Person too close to a vehicle for too long
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityAlert {
    pub person_id: TrackId,
    pub vehicle_id: TrackId,

    /// Measured center distance (pixels)
    pub distance: f64,

    /// Length of the current close streak (seconds)
    pub duration_s: f64,

    pub person_center: Point,
    pub vehicle_center: Point,

    /// Tracker timestamp of the frame that raised the warning
    pub timestamp: Timestamp,
}

/// A pair currently inside the threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosePair {
    pub person_id: TrackId,
    pub vehicle_id: TrackId,
    pub duration_s: f64,
}
