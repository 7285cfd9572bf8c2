//! Run settings stored as JSON next to the binary's working directory

use anyhow::{Context, Result};
use nbody_physics::{
    BodyConfig, Distribution, Particle, FRAMES_PER_FILE_DEFAULT, SPAWN_RADIUS_DEFAULT,
};
use nbody_simulation::SimulationParams;
use nbody_trajectory::TrajectoryConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Where the particles come from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialState {
    Distribution(Distribution),
    Bodies(Vec<BodyConfig>),
}

impl InitialState {
    pub fn particles(&self, g: f32) -> Vec<Particle> {
        match self {
            InitialState::Distribution(distribution) => distribution.generate(g),
            InitialState::Bodies(bodies) => bodies.iter().copied().map(Particle::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ticks to simulate; one frame is recorded per tick
    pub frames_total: u64,
    pub frames_per_file: usize,
    /// gzip level, 0-9
    pub compression_level: u32,
    pub simulation: SimulationParams,
    pub initial: InitialState,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frames_total: 1000,
            frames_per_file: FRAMES_PER_FILE_DEFAULT,
            compression_level: TrajectoryConfig::default().compression_level,
            simulation: SimulationParams::default(),
            initial: InitialState::Distribution(Distribution::Sphere {
                count: 1000,
                radius: SPAWN_RADIUS_DEFAULT,
                mass_min: 1.0,
                mass_max: 10.0,
                seed: 0,
            }),
        }
    }
}

impl Settings {
    /// Read `path`, or write the defaults there if it does not exist yet.
    ///
    /// A file that exists but does not parse is an error, never silently replaced.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Settings::default();
            let json = serde_json::to_string_pretty(&settings)?;
            fs::write(path, json)
                .with_context(|| format!("failed to create {}", path.display()))?;
            log::info!("{} not found, created it with default values", path.display());
            return Ok(settings);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn trajectory_config(&self) -> TrajectoryConfig {
        TrajectoryConfig {
            frames_per_file: self.frames_per_file,
            compression_level: self.compression_level,
        }
    }
}
