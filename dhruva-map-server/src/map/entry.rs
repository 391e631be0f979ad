//! Servable map units.

use serde::{Deserialize, Serialize};

use super::grid::GridArtifact;
use crate::core::Pose2D;

/// Map metadata (matches ROS `nav_msgs/MapMetaData` plus identity).
///
/// Payload of the metadata-changed notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMetaData {
    /// Logical map identifier.
    pub map_id: String,
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Meters per cell.
    pub resolution: f64,
    /// World pose of cell (0, 0).
    pub origin: Pose2D,
    /// Coordinate frame label.
    pub frame_id: String,
    /// Grid load time (microseconds since epoch).
    pub load_time_us: u64,
}

/// A rasterized grid plus identity, ready to be served.
///
/// Immutable once built. Reloading a map means building a new entry and
/// replacing the registry slot.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    id: String,
    frame_id: String,
    grid: GridArtifact,
}

impl MapEntry {
    /// Wrap a grid with its identity and coordinate frame.
    pub fn new(id: impl Into<String>, frame_id: impl Into<String>, grid: GridArtifact) -> Self {
        Self {
            id: id.into(),
            frame_id: frame_id.into(),
            grid,
        }
    }

    /// Same grid and frame under a different id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    pub fn grid(&self) -> &GridArtifact {
        &self.grid
    }

    /// Metadata snapshot of this entry.
    pub fn metadata(&self) -> MapMetaData {
        MapMetaData {
            map_id: self.id.clone(),
            width: self.grid.width(),
            height: self.grid.height(),
            resolution: self.grid.resolution(),
            origin: self.grid.origin(),
            frame_id: self.frame_id.clone(),
            load_time_us: self.grid.load_time_us(),
        }
    }
}
