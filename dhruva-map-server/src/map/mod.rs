//! Map loading pipeline.
//!
//! ```text
//! MapSource ──► MapDescriptor ──► GridArtifact ──► MapEntry
//!   (config)      (descriptor)      (rasterizer)     (entry)
//! ```
//!
//! - [`MapDescriptor`]: Validated ROS-style YAML descriptor
//! - [`rasterize`]: Image decoding and occupancy classification
//! - [`GridArtifact`]: Immutable grid of occupancy values
//! - [`MapEntry`]: Grid plus identity and frame, owned by the registry

mod descriptor;
mod entry;
mod grid;
mod rasterizer;

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

pub use descriptor::{DEFAULT_FREE_THRESH, DEFAULT_OCCUPIED_THRESH, MapDescriptor, MapMode};
pub use entry::{MapEntry, MapMetaData};
pub use grid::{CELL_FREE, CELL_OCCUPIED, CELL_UNKNOWN, GridArtifact};
pub use rasterizer::{rasterize, rasterize_image};

use crate::error::{Error, Result};

/// Where a configured map comes from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MapSource {
    /// ROS-style YAML descriptor.
    Yaml {
        /// Path to the `.yaml` file.
        yaml: PathBuf,
    },
    /// Bare image with explicit resolution (ROS default thresholds).
    Image {
        /// Path to the image file.
        image: PathBuf,
        /// Meters per pixel.
        resolution: f64,
        /// Optional id (defaults to the image path).
        #[serde(default)]
        map_id: Option<String>,
    },
}

impl MapSource {
    /// YAML descriptor source.
    pub fn yaml(path: impl Into<PathBuf>) -> Self {
        MapSource::Yaml { yaml: path.into() }
    }

    /// Resolve the source into a validated descriptor.
    pub fn descriptor(&self) -> Result<MapDescriptor> {
        let descriptor = match self {
            MapSource::Yaml { yaml } => MapDescriptor::load(yaml)?,
            MapSource::Image {
                image,
                resolution,
                map_id,
            } => {
                let descriptor = MapDescriptor::from_image(image, *resolution)?;
                match map_id {
                    Some(id) => descriptor.with_id(id.clone()),
                    None => descriptor,
                }
            }
        };
        Ok(descriptor)
    }
}

impl fmt::Display for MapSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapSource::Yaml { yaml } => write!(f, "{}", yaml.display()),
            MapSource::Image {
                image, resolution, ..
            } => write!(f, "{} @ {} m/px", image.display(), resolution),
        }
    }
}

/// Load one map: descriptor, rasterization, entry construction.
pub fn load_map_entry(source: &MapSource, frame_id: &str) -> Result<MapEntry> {
    let descriptor = source.descriptor()?;
    let grid = rasterize(&descriptor)?;

    log::info!(
        "Read a {} X {} map @ {:.3} m/cell",
        grid.width(),
        grid.height(),
        grid.resolution()
    );
    log::debug!(
        "Map [{}]: {:.2} m² known",
        descriptor.id,
        grid.known_area_m2()
    );

    Ok(MapEntry::new(descriptor.id, frame_id, grid))
}

/// Load every source in order, stopping at the first failure.
///
/// Nothing is returned unless all maps load; an empty source list is a
/// configuration error.
pub fn load_all(sources: &[MapSource], frame_id: &str) -> Result<Vec<MapEntry>> {
    if sources.is_empty() {
        return Err(Error::Config(
            "No maps configured (pass MAP_SOURCE or add [[maps]] to the config)".to_string(),
        ));
    }

    sources
        .iter()
        .map(|source| {
            load_map_entry(source, frame_id).inspect_err(|e| {
                log::error!("Failed to load map {}: {}", source, e);
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_source_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            maps: Vec<MapSource>,
        }

        let wrapper: Wrapper = toml::from_str(
            r#"
            [[maps]]
            yaml = "/srv/maps/kitchen.yaml"

            [[maps]]
            image = "/srv/maps/hall.pgm"
            resolution = 0.1
            map_id = "hall"
            "#,
        )
        .unwrap();

        assert_eq!(wrapper.maps[0], MapSource::yaml("/srv/maps/kitchen.yaml"));
        assert_eq!(
            wrapper.maps[1],
            MapSource::Image {
                image: PathBuf::from("/srv/maps/hall.pgm"),
                resolution: 0.1,
                map_id: Some("hall".to_string()),
            }
        );
    }

    #[test]
    fn test_image_source_id_override() {
        let source = MapSource::Image {
            image: PathBuf::from("/srv/maps/hall.pgm"),
            resolution: 0.1,
            map_id: Some("hall".to_string()),
        };
        assert_eq!(source.descriptor().unwrap().id, "hall");
    }
}
