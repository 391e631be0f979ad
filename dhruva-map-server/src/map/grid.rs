//! Immutable occupancy grid produced by the rasterizer.
//!
//! Cell values follow the ROS `nav_msgs/OccupancyGrid` convention:
//! -1 = unknown, 0..=100 = occupancy percent. Row 0 is the bottom row of the
//! map, at `origin`.

use std::sync::Arc;

use crate::core::{Pose2D, now_us};
use crate::error::RasterizeError;

/// Cell value for unknown space.
pub const CELL_UNKNOWN: i8 = -1;

/// Cell value for free space.
pub const CELL_FREE: i8 = 0;

/// Cell value for occupied space.
pub const CELL_OCCUPIED: i8 = 100;

/// Rasterized occupancy grid.
///
/// Never mutated after construction; cell storage is shared between clones.
#[derive(Debug, Clone, PartialEq)]
pub struct GridArtifact {
    width: u32,
    height: u32,
    resolution: f64,
    origin: Pose2D,
    cells: Arc<[i8]>,
    load_time_us: u64,
}

impl GridArtifact {
    /// Create a grid stamped with the current time.
    pub fn new(
        width: u32,
        height: u32,
        resolution: f64,
        origin: Pose2D,
        cells: Vec<i8>,
    ) -> Result<Self, RasterizeError> {
        Self::with_load_time(width, height, resolution, origin, cells, now_us())
    }

    /// Create a grid with an explicit load timestamp (microseconds).
    pub fn with_load_time(
        width: u32,
        height: u32,
        resolution: f64,
        origin: Pose2D,
        cells: Vec<i8>,
        load_time_us: u64,
    ) -> Result<Self, RasterizeError> {
        if width == 0 || height == 0 {
            return Err(RasterizeError::InvalidGrid(format!(
                "dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(RasterizeError::InvalidGrid(format!(
                "expected {} cells for {}x{}, got {}",
                expected,
                width,
                height,
                cells.len()
            )));
        }
        if let Some(bad) = cells
            .iter()
            .find(|&&c| c != CELL_UNKNOWN && !(CELL_FREE..=CELL_OCCUPIED).contains(&c))
        {
            return Err(RasterizeError::InvalidGrid(format!(
                "cell value {} outside -1 and 0..=100",
                bad
            )));
        }

        Ok(Self {
            width,
            height,
            resolution,
            origin,
            cells: cells.into(),
            load_time_us,
        })
    }

    /// Grid width in cells.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Meters per cell.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// World pose of cell (0, 0).
    pub fn origin(&self) -> Pose2D {
        self.origin
    }

    /// Row-major cells, bottom row first.
    pub fn cells(&self) -> &[i8] {
        &self.cells
    }

    /// Cell at column `x`, row `y` (row 0 at the bottom).
    pub fn cell(&self, x: u32, y: u32) -> Option<i8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[y as usize * self.width as usize + x as usize])
    }

    /// Time the grid was produced, microseconds since epoch.
    pub fn load_time_us(&self) -> u64 {
        self.load_time_us
    }

    /// Area of known (non-unknown) cells in square meters.
    pub fn known_area_m2(&self) -> f64 {
        let known = self.cells.iter().filter(|&&c| c != CELL_UNKNOWN).count();
        known as f64 * self.resolution * self.resolution
    }
}
