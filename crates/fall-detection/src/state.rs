//! Fall state tracking

use std::collections::BTreeSet;

use entity::{Point, Timestamp, TrackId};
use serde::{Deserialize, Serialize};

/// Fall state for one person (tracked over time)
#[derive(Debug, Clone, PartialEq)]
pub struct FallState {
    pub person_id: TrackId,

    /// First frame of the current lying episode
    pub first_detected: Timestamp,

    /// Latest frame the person was lying
    pub last_detected: Timestamp,

    /// Time spent down so far (seconds)
    pub duration: f64,

    /// A PersonDown alert already fired for this episode
    pub alerted: bool,

    pub last_alert_time: Option<Timestamp>,
}

impl FallState {
    pub fn new(person_id: TrackId, timestamp: Timestamp) -> Self {
        Self {
            person_id,
            first_detected: timestamp,
            last_detected: timestamp,
            duration: 0.0,
            alerted: false,
            last_alert_time: None,
        }
    }

    /// Refresh with another lying frame, returning the duration
    pub fn update(&mut self, timestamp: Timestamp) -> f64 {
        self.last_detected = timestamp;
        self.duration = timestamp - self.first_detected;
        self.duration
    }
}

/// Person down long enough to alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallAlert {
    pub person_id: TrackId,

    /// Person center at alert time
    pub location: Point,

    /// Time spent down (seconds)
    pub duration_s: f64,

    /// Detection confidence of the person box
    pub confidence: f32,

    pub timestamp: Timestamp,
}

/// Result of one fall tracker update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FallUpdate {
    /// Every person lying this frame, alerted or not
    pub fallen: BTreeSet<TrackId>,

    /// Alerts that fired this frame
    pub alerts: Vec<FallAlert>,

    /// Alerted people whose state expired after getting back up
    pub recovered: Vec<TrackId>,
}
