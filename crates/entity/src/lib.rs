//! Entity Model
//!
//! Shared representation of the tracked objects delivered by the upstream
//! detector/tracker each frame:
//! - Identity-stable people and vehicles
//! - Image-plane geometry (boxes, centers, distances)
//! - Monotonic timestamp guard used by every tracker

pub mod clock;
pub mod geometry;

pub use clock::{MonotonicGuard, Timestamp};
pub use geometry::{BoundingBox, Point};

use serde::{Deserialize, Serialize};

/// Track identifier assigned by the upstream tracker
pub type TrackId = u32;

/// Entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Vehicle,
}

/// One tracked object for the current frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable track identifier
    pub id: TrackId,

    /// Person or vehicle
    pub kind: EntityKind,

    /// Detector class label ("person", "truck", "car", ...)
    pub class_label: String,

    /// Bounding box in pixels
    pub bbox: BoundingBox,

    /// Center point in pixels
    pub center: Point,

    /// Detection confidence (0-1)
    pub confidence: f32,
}

impl Entity {
    /// Create an entity whose center is the center of its box
    pub fn new(
        id: TrackId,
        kind: EntityKind,
        class_label: impl Into<String>,
        bbox: BoundingBox,
        confidence: f32,
    ) -> Self {
        Self {
            id,
            kind,
            class_label: class_label.into(),
            center: bbox.center(),
            bbox,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Person with a box of `size` (width, height) around `center`
    pub fn person(id: TrackId, center: (f64, f64), size: (f64, f64)) -> Self {
        let bbox = BoundingBox::centered(center.into(), size.0, size.1);
        Self::new(id, EntityKind::Person, "person", bbox, 0.9)
    }

    /// Vehicle with a box of `size` (width, height) around `center`
    pub fn vehicle(
        id: TrackId,
        label: impl Into<String>,
        center: (f64, f64),
        size: (f64, f64),
    ) -> Self {
        let bbox = BoundingBox::centered(center.into(), size.0, size.1);
        Self::new(id, EntityKind::Vehicle, label, bbox, 0.9)
    }

    /// Planar distance between the two centers
    pub fn distance_to(&self, other: &Entity) -> f64 {
        self.center.distance_to(&other.center)
    }

    pub fn is_person(&self) -> bool {
        self.kind == EntityKind::Person
    }

    pub fn is_vehicle(&self) -> bool {
        self.kind == EntityKind::Vehicle
    }
}
