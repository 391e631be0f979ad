//! Test utilities for map server integration tests.
//!
//! Fixtures are written into a temporary directory: a grayscale PNG plus a
//! ROS-style YAML descriptor pointing at it.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dhruva_map_server::map::GridArtifact;
use dhruva_map_server::{MapEntry, MapSource, Pose2D, load_map_entry};
use image::{GrayImage, Luma};

/// Pixel intensity for free space.
pub const WHITE: u8 = 254;
/// Pixel intensity for obstacles.
pub const BLACK: u8 = 0;
/// Pixel intensity for unexplored space.
pub const GRAY: u8 = 205;

/// Write `<name>.png` and `<name>.yaml` into `dir`; returns the YAML path.
///
/// `pixel(x, y)` uses image coordinates (row 0 at the top).
pub fn write_map(
    dir: &Path,
    name: &str,
    width: u32,
    height: u32,
    pixel: impl Fn(u32, u32) -> u8,
) -> PathBuf {
    let image_path = dir.join(format!("{}.png", name));
    GrayImage::from_fn(width, height, |x, y| Luma([pixel(x, y)]))
        .save(&image_path)
        .unwrap();

    let yaml_path = dir.join(format!("{}.yaml", name));
    std::fs::write(
        &yaml_path,
        format!(
            "image: {name}.png\n\
             resolution: 0.05\n\
             origin: [-1.0, -2.0, 0.0]\n\
             negate: 0\n\
             occupied_thresh: 0.65\n\
             free_thresh: 0.196\n\
             map_id: {name}\n"
        ),
    )
    .unwrap();
    yaml_path
}

/// Square map of free cells.
pub fn write_free_map(dir: &Path, name: &str, size: u32) -> PathBuf {
    write_map(dir, name, size, size, |_, _| WHITE)
}

/// Load a fixture through the full descriptor/rasterizer pipeline.
pub fn load(yaml: &Path) -> MapEntry {
    load_map_entry(&MapSource::yaml(yaml), "map").unwrap()
}

/// In-memory entry with uniform cells (no files involved).
pub fn uniform_entry(id: &str, width: u32, height: u32, value: i8) -> MapEntry {
    let cells = vec![value; (width * height) as usize];
    let grid = GridArtifact::new(width, height, 0.05, Pose2D::identity(), cells).unwrap();
    MapEntry::new(id, "map", grid)
}

/// Whether an entry is internally consistent: dimensions match cell count.
pub fn is_consistent(entry: &Arc<MapEntry>) -> bool {
    let grid = entry.grid();
    grid.cells().len() == (grid.width() * grid.height()) as usize
}
