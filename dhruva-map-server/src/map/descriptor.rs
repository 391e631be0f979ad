//! Map descriptor loading from ROS-standard YAML files.
//!
//! A descriptor names the image to rasterize and the numeric parameters the
//! rasterizer needs. Two sources are supported:
//!
//! - `{name}.yaml` - full descriptor (image, resolution, origin, negate,
//!   thresholds, optional map_id and mode)
//! - bare image + resolution - legacy source with ROS default thresholds
//!
//! All safety-relevant fields are required in YAML; there are no silent
//! defaults for thresholds or origin.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::Pose2D;
use crate::error::DescriptorError;

/// Occupied threshold used for bare-image sources.
pub const DEFAULT_OCCUPIED_THRESH: f64 = 0.65;

/// Free threshold used for bare-image sources.
pub const DEFAULT_FREE_THRESH: f64 = 0.196;

/// How pixel intensities between the thresholds are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMode {
    /// Occupied / free / unknown only.
    #[default]
    Trinary,
    /// Intermediate intensities scale linearly to 1..=99.
    Scale,
}

impl MapMode {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "trinary" => Some(MapMode::Trinary),
            "scale" => Some(MapMode::Scale),
            _ => None,
        }
    }
}

impl fmt::Display for MapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapMode::Trinary => write!(f, "trinary"),
            MapMode::Scale => write!(f, "scale"),
        }
    }
}

/// Validated configuration for one map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDescriptor {
    /// Logical map name (defaults to the descriptor source path).
    pub id: String,
    /// Path to the image to rasterize (absolute, or relative to the process).
    pub image_path: PathBuf,
    /// Meters per cell.
    pub resolution: f64,
    /// World pose of the lower-left cell.
    pub origin: Pose2D,
    /// Treat dark pixels as free instead of occupied.
    pub negate: bool,
    /// Occupancy probability above which a cell is occupied.
    pub occupied_thresh: f64,
    /// Occupancy probability below which a cell is free.
    pub free_thresh: f64,
    /// Interpretation of intermediate intensities.
    pub mode: MapMode,
}

/// `negate` is written as 0/1 by most tools but YAML booleans are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NegateFlag {
    Bool(bool),
    Int(i64),
}

/// Raw YAML document before validation.
#[derive(Debug, Default, Deserialize)]
struct RawDescriptor {
    image: Option<String>,
    resolution: Option<f64>,
    origin: Option<Vec<f64>>,
    negate: Option<NegateFlag>,
    occupied_thresh: Option<f64>,
    free_thresh: Option<f64>,
    map_id: Option<String>,
    mode: Option<String>,
}

impl MapDescriptor {
    /// Load and validate a descriptor from a YAML file.
    pub fn load<P: AsRef<Path>>(yaml_path: P) -> Result<Self, DescriptorError> {
        let yaml_path = yaml_path.as_ref();
        let content = std::fs::read_to_string(yaml_path).map_err(|source| DescriptorError::Io {
            path: yaml_path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, yaml_path)
    }

    /// Parse and validate descriptor YAML. `source_path` is used to resolve a
    /// relative image path and as the default id.
    pub fn parse(content: &str, source_path: &Path) -> Result<Self, DescriptorError> {
        let raw: RawDescriptor =
            serde_yaml::from_str(content).map_err(|source| DescriptorError::Yaml {
                path: source_path.to_path_buf(),
                source,
            })?;

        let resolution = raw
            .resolution
            .ok_or(DescriptorError::MissingField("resolution"))?;

        let negate = match raw.negate.ok_or(DescriptorError::MissingField("negate"))? {
            NegateFlag::Bool(b) => b,
            NegateFlag::Int(0) => false,
            NegateFlag::Int(1) => true,
            NegateFlag::Int(other) => {
                return Err(DescriptorError::InvalidField {
                    field: "negate",
                    reason: format!("expected 0 or 1, got {}", other),
                });
            }
        };

        let occupied_thresh = raw
            .occupied_thresh
            .ok_or(DescriptorError::MissingField("occupied_thresh"))?;
        let free_thresh = raw
            .free_thresh
            .ok_or(DescriptorError::MissingField("free_thresh"))?;

        let id = match raw.map_id {
            Some(id) if !id.is_empty() => id,
            _ => {
                log::warn!(
                    "The map does not contain a map_id tag or it is invalid, using {}",
                    source_path.display()
                );
                source_path.display().to_string()
            }
        };

        let origin = raw.origin.ok_or(DescriptorError::MissingField("origin"))?;
        let origin: [f64; 3] =
            origin
                .as_slice()
                .try_into()
                .map_err(|_| DescriptorError::InvalidField {
                    field: "origin",
                    reason: format!("expected [x, y, yaw], got {} values", origin.len()),
                })?;

        let image = raw.image.ok_or(DescriptorError::MissingField("image"))?;
        if image.is_empty() {
            return Err(DescriptorError::InvalidField {
                field: "image",
                reason: "the image tag cannot be an empty string".to_string(),
            });
        }
        let image_path = resolve_image_path(source_path, &image);

        let mode = match raw.mode {
            None => MapMode::default(),
            Some(value) => MapMode::parse(&value).ok_or_else(|| DescriptorError::InvalidField {
                field: "mode",
                reason: format!("unsupported mode '{}'", value),
            })?,
        };

        let descriptor = Self {
            id,
            image_path,
            resolution,
            origin: Pose2D::from_array(origin),
            negate,
            occupied_thresh,
            free_thresh,
            mode,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Legacy source: a bare image with an explicit resolution.
    ///
    /// Uses ROS defaults (negate off, thresholds 0.65/0.196, origin at zero).
    pub fn from_image<P: AsRef<Path>>(
        image_path: P,
        resolution: f64,
    ) -> Result<Self, DescriptorError> {
        let image_path = image_path.as_ref();
        let descriptor = Self {
            id: image_path.display().to_string(),
            image_path: image_path.to_path_buf(),
            resolution,
            origin: Pose2D::identity(),
            negate: false,
            occupied_thresh: DEFAULT_OCCUPIED_THRESH,
            free_thresh: DEFAULT_FREE_THRESH,
            mode: MapMode::Trinary,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Override the logical id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Check numeric invariants.
    ///
    /// Threshold inversion (`free >= occupied`) is accepted with a warning;
    /// the band between them is then treated as unknown by the rasterizer.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(DescriptorError::InvalidField {
                field: "resolution",
                reason: format!("must be a positive number, got {}", self.resolution),
            });
        }
        if !self.origin.is_finite() {
            return Err(DescriptorError::InvalidField {
                field: "origin",
                reason: "values must be finite".to_string(),
            });
        }
        for (field, value) in [
            ("occupied_thresh", self.occupied_thresh),
            ("free_thresh", self.free_thresh),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DescriptorError::InvalidField {
                    field,
                    reason: format!("must be within [0, 1], got {}", value),
                });
            }
        }
        if self.free_thresh >= self.occupied_thresh {
            log::warn!(
                "Map {}: free_thresh {} is not below occupied_thresh {}",
                self.id,
                self.free_thresh,
                self.occupied_thresh
            );
        }
        Ok(())
    }
}

/// Resolve `image` against the directory holding the descriptor.
fn resolve_image_path(descriptor_path: &Path, image: &str) -> PathBuf {
    let image = Path::new(image);
    if image.is_absolute() {
        return image.to_path_buf();
    }
    match descriptor_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(image),
        _ => image.to_path_buf(),
    }
}
