//! Image-plane geometry

use serde::{Deserialize, Serialize};

/// Point in image coordinates (pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box `(x1, y1, x2, y2)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box of the given size centered on `center`
    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self {
            x1: center.x - width / 2.0,
            y1: center.y - height / 2.0,
            x2: center.x + width / 2.0,
            y2: center.y + height / 2.0,
        }
    }

    /// Width, never negative
    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    /// Height, never negative
    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Height over width. Zero for a zero-width box.
    pub fn aspect_ratio(&self) -> f64 {
        let width = self.width();
        if width > 0.0 {
            self.height() / width
        } else {
            0.0
        }
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.x1 + self.x2) / 2.0,
            y: (self.y1 + self.y2) / 2.0,
        }
    }
}
