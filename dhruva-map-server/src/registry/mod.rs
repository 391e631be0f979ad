//! Map registry and its notification seam.
//!
//! - [`MapRegistry`]: Owns every loaded [`crate::map::MapEntry`] and the active id
//! - [`NotificationSink`]: Receives metadata and switch announcements

mod events;
mod map_registry;

pub use events::{
    ChannelSink, FanoutSink, LogSink, MapSwitch, NotificationSink, NullSink, RegistryEvent,
};
pub use map_registry::{MapRegistry, MapSummary, SharedRegistry, SwitchOutcome};
