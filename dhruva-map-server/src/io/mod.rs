//! Network transport for the map registry.
//!
//! - [`wire`]: Length-prefixed JSON framing
//! - [`messages`]: Request, response and published frame types
//! - [`RequestGateway`]: Request/response TCP server (get, select, list)
//! - [`LatchedPublisher`]: Push-based TCP publication with latching

pub mod messages;
pub mod wire;

mod gateway;
mod latched_publisher;

pub use gateway::{RequestGateway, handle_request};
pub use latched_publisher::LatchedPublisher;
pub use messages::{ErrorKind, MapHeader, OccupancyGridMsg, Published, Request, Response};
pub use wire::{DEFAULT_MAX_FRAME_BYTES, poll_frame, read_frame, write_frame};
