//! Alert records as written to the event log and pushed to subscribers

use std::fmt;

use chrono::{DateTime, Utc};
use entity::{Point, TrackId};
use fall_detection::FallAlert;
use headcount::HeadcountCheck;
use proximity::ProximityAlert;
use serde::{Deserialize, Serialize};

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        };
        f.write_str(name)
    }
}

/// Alert payload, tagged by `type` in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlertKind {
    ProximityWarning {
        person_id: TrackId,
        vehicle_id: TrackId,
        /// Center distance in pixels
        proximity_score: f64,
        duration_s: f64,
        person_center: [f64; 2],
        vehicle_center: [f64; 2],
    },
    PersonDown {
        person_id: TrackId,
        location: [f64; 2],
        confidence: f32,
    },
    HeadcountMismatch {
        detected_count: u32,
        expected_count: u32,
        mode_count: u32,
        severity: Severity,
    },
}

impl AlertKind {
    pub fn name(&self) -> &'static str {
        match self {
            AlertKind::ProximityWarning { .. } => "ProximityWarning",
            AlertKind::PersonDown { .. } => "PersonDown",
            AlertKind::HeadcountMismatch { .. } => "HeadcountMismatch",
        }
    }
}

/// One delivered alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Wall-clock time of the frame
    pub timestamp: DateTime<Utc>,
    /// Frame number the alert was raised on
    pub frame: u64,
    #[serde(flatten)]
    pub kind: AlertKind,
}

impl AlertRecord {
    pub fn proximity(alert: &ProximityAlert, frame: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            frame,
            kind: AlertKind::ProximityWarning {
                person_id: alert.person_id,
                vehicle_id: alert.vehicle_id,
                proximity_score: alert.distance,
                duration_s: alert.duration_s,
                person_center: pair(alert.person_center),
                vehicle_center: pair(alert.vehicle_center),
            },
        }
    }

    pub fn person_down(alert: &FallAlert, frame: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            frame,
            kind: AlertKind::PersonDown {
                person_id: alert.person_id,
                location: pair(alert.location),
                confidence: alert.confidence,
            },
        }
    }

    pub fn headcount_mismatch(check: &HeadcountCheck, frame: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            frame,
            kind: AlertKind::HeadcountMismatch {
                detected_count: check.current_count,
                expected_count: check.expected_count,
                mode_count: check.mode_count,
                severity: Severity::High,
            },
        }
    }

    /// Severity used for log levels and presentation
    pub fn severity(&self) -> Severity {
        match &self.kind {
            AlertKind::ProximityWarning { .. } => Severity::High,
            AlertKind::PersonDown { .. } => Severity::Critical,
            AlertKind::HeadcountMismatch { severity, .. } => *severity,
        }
    }
}

impl fmt::Display for AlertRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AlertKind::ProximityWarning {
                person_id,
                vehicle_id,
                proximity_score,
                duration_s,
                ..
            } => write!(
                f,
                "Person #{} within proximity of vehicle #{} for {:.1}s (distance: {:.1}px)",
                person_id, vehicle_id, duration_s, proximity_score
            ),
            AlertKind::PersonDown {
                person_id,
                confidence,
                ..
            } => write!(f, "PersonDown #{} (confidence: {:.2})", person_id, confidence),
            AlertKind::HeadcountMismatch {
                detected_count,
                expected_count,
                mode_count,
                ..
            } => write!(
                f,
                "Headcount mismatch: expected {}, mode {} (current: {})",
                expected_count, mode_count, detected_count
            ),
        }
    }
}

fn pair(point: Point) -> [f64; 2] {
    [point.x, point.y]
}
