//! Configuration loading for the map server.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::io::DEFAULT_MAX_FRAME_BYTES;
use crate::map::MapSource;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Coordinate frame stamped on every served map (default: "map")
    #[serde(default = "default_frame_id")]
    pub frame_id: String,

    /// Maps to load at startup, in order. The first becomes active.
    #[serde(default)]
    pub maps: Vec<MapSource>,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub publisher: PublisherConfig,
}

/// Request gateway settings
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayConfig {
    /// TCP bind address (default: 0.0.0.0:5560)
    #[serde(default = "default_gateway_address")]
    pub bind_address: String,

    /// Largest inbound request frame in bytes (default: 64 MiB)
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Client socket read timeout in milliseconds (default: 500)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

/// Latched publisher settings
#[derive(Clone, Debug, Deserialize)]
pub struct PublisherConfig {
    /// TCP bind address (default: 0.0.0.0:5561)
    #[serde(default = "default_publisher_address")]
    pub bind_address: String,

    /// Start the publisher (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: default_gateway_address(),
            max_frame_bytes: default_max_frame_bytes(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            bind_address: default_publisher_address(),
            enabled: default_enabled(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_id: default_frame_id(),
            maps: Vec::new(),
            gateway: GatewayConfig::default(),
            publisher: PublisherConfig::default(),
        }
    }
}

// Default value functions
fn default_frame_id() -> String {
    "map".to_string()
}
fn default_gateway_address() -> String {
    "0.0.0.0:5560".to_string()
}
fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}
fn default_read_timeout() -> u64 {
    500
}
fn default_publisher_address() -> String {
    "0.0.0.0:5561".to_string()
}
fn default_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Append map sources (e.g. from the command line) after the configured ones
    pub fn with_maps(mut self, sources: impl IntoIterator<Item = MapSource>) -> Self {
        self.maps.extend(sources);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.frame_id.trim().is_empty() {
            return Err(Error::Config("frame_id must not be empty".to_string()));
        }
        if self.gateway.max_frame_bytes == 0 {
            return Err(Error::Config(
                "gateway.max_frame_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
