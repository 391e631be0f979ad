//! Core foundation layer.
//!
//! Bottom layer of the map server with no internal dependencies.
//!
//! # Contents
//!
//! - [`Pose2D`]: Map origin pose (x, y, yaw)
//! - [`now_us`]: Wall-clock timestamps in microseconds since epoch

mod pose;
mod time;

pub use pose::Pose2D;
pub use time::now_us;
