//! Pose type for map origins.

use serde::{Deserialize, Serialize};

/// Pose in the map plane.
///
/// Used as the world pose of the lower-left cell of a grid. Yaw is kept
/// exactly as configured; map descriptors are not normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in meters
    pub x: f64,
    /// Y position in meters
    pub y: f64,
    /// Heading in radians
    pub yaw: f64,
}

impl Pose2D {
    /// Create a new pose.
    #[inline]
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    /// Identity pose at origin with zero heading.
    #[inline]
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Build from a `[x, y, yaw]` triple as found in map YAML files.
    #[inline]
    pub fn from_array(values: [f64; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    /// Whether every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.yaw.is_finite()
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::identity()
    }
}
