//! Vehicle records

use chrono::{DateTime, Utc};
use entity::Point;
use serde::{Deserialize, Serialize};

/// Registry identifier
pub type VehicleId = u32;

/// Operational status of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    #[default]
    Active,
    Idle,
    OffSite,
}

/// Persisted vehicle entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: VehicleId,

    /// Detector class label ("truck", "car", ...)
    pub label: String,

    pub status: VehicleStatus,

    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,

    /// Last known image position, stored as `[x, y]`
    #[serde(default, with = "point_pair")]
    pub location: Option<Point>,
}

impl VehicleRecord {
    pub fn new(id: VehicleId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            status: VehicleStatus::Active,
            last_seen: None,
            location: None,
        }
    }
}

mod point_pair {
    use entity::Point;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Point>, serializer: S) -> Result<S::Ok, S::Error> {
        value.map(|p| [p.x, p.y]).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Point>, D::Error> {
        let pair = Option::<[f64; 2]>::deserialize(deserializer)?;
        Ok(pair.map(|[x, y]| Point::new(x, y)))
    }
}
