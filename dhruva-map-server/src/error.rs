//! Error types for the map server.
//!
//! Startup errors ([`DescriptorError`], [`RasterizeError`]) are fatal: the
//! daemon refuses to serve a partially configured map set. Runtime errors
//! ([`RegistryError`], [`WireError`]) are returned to the caller and never
//! touch registry state.

use std::path::PathBuf;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Map descriptor (YAML) loading errors.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// Descriptor file could not be read
    #[error("Map server could not open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor file is not valid YAML
    #[error("Failed to parse map YAML {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Required tag absent
    #[error("The map does not contain a {0} tag")]
    MissingField(&'static str),

    /// Tag present but unusable
    #[error("The map {field} tag is invalid: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

/// Image to occupancy grid conversion errors.
#[derive(Debug, thiserror::Error)]
pub enum RasterizeError {
    /// Image decoder failed (unreadable file or unsupported format)
    #[error("Failed to load map image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Image decoded but has no pixels
    #[error("Map image {0} is empty")]
    EmptyImage(PathBuf),

    /// Grid dimensions or cell values violate the grid invariants
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),
}

/// Runtime registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Requested map id is not loaded
    #[error("Map not found: {0}")]
    NotFound(String),

    /// No map has been loaded yet
    #[error("No map available")]
    Unavailable,
}

/// Wire framing errors.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Socket I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame length prefix exceeds the configured limit
    #[error("Frame too large: {size} bytes (limit {limit})")]
    FrameTooLarge { size: usize, limit: usize },

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WireError {
    /// Whether the peer closed the connection.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            WireError::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            )
        )
    }

    /// Whether a read timed out without receiving data.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            WireError::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )
        )
    }
}

/// Map server error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Map descriptor error
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Rasterization error
    #[error(transparent)]
    Rasterize(#[from] RasterizeError),

    /// Registry error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Wire protocol error
    #[error(transparent)]
    Wire(#[from] WireError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
