//! # N-Body Physics
//!
//! Point masses, the softened gravitational force law and initial conditions
//! shared by every force strategy.

pub mod constants;
pub mod distribution;
pub mod forces;
pub mod particle;

pub use constants::*;
pub use distribution::*;
pub use forces::*;
pub use particle::*;
