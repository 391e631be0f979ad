//! DhruvaMapServer - Multi-map occupancy grid server
//!
//! Loads one or more static occupancy maps at startup, keeps them resident
//! and serves exactly one "active" map at a time. The active map can be
//! switched at runtime without restarting; interested parties are notified
//! so they stop publishing the old map and start publishing the new one.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              main.rs / bin/map_ctl.rs               │  ← Executables
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Transport
//! │     (wire, messages, gateway, latched publisher)    │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   registry/                         │  ← Map store
//! │        (MapRegistry, notification sinks)            │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      map/                           │  ← Loading
//! │    (descriptor, rasterizer, grid, entry)            │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                 (pose, time)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dhruva_map_server::{MapRegistry, MapSource, load_map_entry};
//!
//! let registry = Arc::new(MapRegistry::new());
//! for path in ["/srv/maps/kitchen.yaml", "/srv/maps/hall.yaml"] {
//!     let entry = load_map_entry(&MapSource::yaml(path), "map").unwrap();
//!     registry.load(entry.id().to_string(), entry);
//! }
//!
//! registry.switch_active("hall").unwrap();
//! let active = registry.serve().unwrap();
//! println!("{} is {}x{}", active.id(), active.grid().width(), active.grid().height());
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod map;
pub mod registry;

pub use config::Config;
pub use core::Pose2D;
pub use error::{Error, RegistryError, Result};
pub use map::{
    GridArtifact, MapDescriptor, MapEntry, MapMetaData, MapSource, load_all, load_map_entry,
};
pub use registry::{
    MapRegistry, MapSwitch, NotificationSink, RegistryEvent, SharedRegistry, SwitchOutcome,
};
