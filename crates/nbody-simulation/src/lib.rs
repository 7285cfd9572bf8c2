//! # N-Body Simulation
//!
//! Exact all-pairs force accumulation (naive CPU, symmetric pair table, tiled
//! GPU), semi-implicit Euler integration and the tick loop that records one
//! trajectory frame per step.

pub mod accumulate;
pub mod chunks;
pub mod error;
pub mod gpu;
pub mod integrate;
pub mod pairs;
pub mod params;
pub mod simulation;

pub use accumulate::*;
pub use chunks::*;
pub use error::*;
pub use gpu::*;
pub use integrate::*;
pub use pairs::*;
pub use params::*;
pub use simulation::*;
