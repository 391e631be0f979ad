//! Message types for the request gateway and the latched publisher.
//!
//! All messages are JSON objects with a discriminator field:
//! - Requests (client → gateway): `"command"`
//! - Responses (gateway → client): `"type"`
//! - Published frames (publisher → subscriber): `"topic"`

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::map::{MapEntry, MapMetaData};
use crate::registry::MapSummary;

/// Request received from gateway clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum Request {
    /// Fetch the active map
    #[serde(rename = "get_map")]
    GetMap,

    /// Fetch a specific map without changing the active one
    #[serde(rename = "get_map_by_id")]
    GetMapById {
        /// Map to fetch
        map_id: String,
    },

    /// Make a map active
    #[serde(rename = "select_map")]
    SelectMap {
        /// Map to activate
        map_id: String,
    },

    /// List every loaded map
    #[serde(rename = "list_maps")]
    ListMaps,
}

/// Error categories reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No map loaded yet
    Unavailable,
    /// Requested map id is not loaded
    NotFound,
    /// Request could not be decoded
    BadRequest,
}

/// Response sent by the gateway, one per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Full occupancy grid
    #[serde(rename = "map")]
    Map(OccupancyGridMsg),

    /// Result of a `select_map` request
    #[serde(rename = "selected")]
    Selected {
        map_id: String,
        /// False when the map was already active
        changed: bool,
    },

    /// Result of a `list_maps` request
    #[serde(rename = "map_list")]
    MapList {
        active_map_id: Option<String>,
        maps: Vec<MapSummary>,
    },

    /// Request failed
    #[serde(rename = "error")]
    Error { kind: ErrorKind, message: String },
}

impl Response {
    /// Error response with the given kind.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error {
            kind,
            message: message.into(),
        }
    }
}

impl From<RegistryError> for Response {
    fn from(err: RegistryError) -> Self {
        let kind = match err {
            RegistryError::NotFound(_) => ErrorKind::NotFound,
            RegistryError::Unavailable => ErrorKind::Unavailable,
        };
        Response::error(kind, err.to_string())
    }
}

/// Message header (ROS `std_msgs/Header` subset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapHeader {
    /// Coordinate frame of the grid
    pub frame_id: String,
    /// Timestamp in microseconds since epoch (grid load time)
    pub stamp_us: u64,
}

/// Occupancy grid message (ROS `nav_msgs/OccupancyGrid` equivalent).
///
/// Cell values: -1 unknown, 0 free, 100 occupied (1..=99 in scale mode).
/// Row-major, row 0 at the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyGridMsg {
    pub header: MapHeader,
    pub info: MapMetaData,
    pub data: Vec<i8>,
}

impl OccupancyGridMsg {
    /// Build the message for a registry entry.
    pub fn from_entry(entry: &MapEntry) -> Self {
        Self {
            header: MapHeader {
                frame_id: entry.frame_id().to_string(),
                stamp_us: entry.grid().load_time_us(),
            },
            info: entry.metadata(),
            data: entry.grid().cells().to_vec(),
        }
    }

    /// Count of (unknown, free, occupied) cells. Scale values count as occupied.
    pub fn cell_counts(&self) -> (usize, usize, usize) {
        self.data
            .iter()
            .fold((0, 0, 0), |(unknown, free, occupied), &cell| match cell {
                c if c < 0 => (unknown + 1, free, occupied),
                0 => (unknown, free + 1, occupied),
                _ => (unknown, free, occupied + 1),
            })
    }
}

/// Frame pushed to latched-publisher subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic")]
pub enum Published {
    /// Active map metadata
    #[serde(rename = "metadata")]
    Metadata(MapMetaData),

    /// Active map content
    #[serde(rename = "map")]
    Map(OccupancyGridMsg),

    /// Map that is no longer active
    #[serde(rename = "map_deactivated")]
    MapDeactivated { map_id: String },
}
