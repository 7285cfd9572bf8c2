//! Default run constants for the gravity simulation
//!
//! Everything here is only a default. The actual values travel with the run
//! configuration so that CPU and GPU strategies always agree on them.

/// Gravitational constant in simulation units
pub const G_DEFAULT: f32 = 1.0;

/// Softening added to the squared distance to prevent singularities at r→0
pub const SOFTENING_DEFAULT: f32 = 1.0e-3;

/// Fixed integration timestep
pub const DT_DEFAULT: f32 = 0.01;

/// Particles staged per workgroup tile on the GPU
pub const TILE_SIZE_DEFAULT: u32 = 64;

/// Largest tile accepted (wgpu's default `max_compute_invocations_per_workgroup`)
pub const TILE_SIZE_MAX: u32 = 256;

/// Pairs claimed per call to the chunk manager
pub const CHUNK_SIZE_DEFAULT: usize = 4096;

/// Frames stored in one batch file before rotating
pub const FRAMES_PER_FILE_DEFAULT: usize = 100;

/// Radius of the default spawn volume
pub const SPAWN_RADIUS_DEFAULT: f32 = 50.0;
