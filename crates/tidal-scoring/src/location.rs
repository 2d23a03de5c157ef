//! Planar node positions.

use serde::{Deserialize, Serialize};

/// A position on the simulation plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    /// Origin of the plane.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new location.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}
