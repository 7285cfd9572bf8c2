//! # N-Body Trajectory
//!
//! The binary frame format consumed by playback tools: gzip-compressed batch
//! files of little-endian `f32` positions, written with rotation at a fixed
//! frame capacity and read back in file-name order.

pub mod emitter;
pub mod error;
pub mod format;
pub mod reader;
pub mod sink;

pub use emitter::*;
pub use error::*;
pub use format::*;
pub use reader::*;
pub use sink::*;
