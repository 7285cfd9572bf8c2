//! Run parameters and their GPU uniform form

use crate::SimulationError;
use bytemuck::{Pod, Zeroable};
use nbody_physics::{ForceLaw, CHUNK_SIZE_DEFAULT, DT_DEFAULT, TILE_SIZE_DEFAULT, TILE_SIZE_MAX};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Uniform block read by the force kernel (matches WGSL `Params`)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuParams {
    pub particle_count: u32,
    pub g: f32,
    pub softening: f32,
    pub _padding: f32,
}

impl GpuParams {
    pub fn new(particle_count: u32, law: ForceLaw) -> Self {
        Self {
            particle_count,
            g: law.g,
            softening: law.softening,
            _padding: 0.0,
        }
    }
}

/// Force accumulation algorithm
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Per-particle double loop, no symmetry
    Naive,
    /// Pair table filled once per pair and mirrored
    Symmetric,
    /// Tiled reduction on the accelerator
    Gpu,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Naive => "naive",
            Strategy::Symmetric => "symmetric",
            Strategy::Gpu => "gpu",
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naive" => Ok(Strategy::Naive),
            "symmetric" => Ok(Strategy::Symmetric),
            "gpu" => Ok(Strategy::Gpu),
            other => Err(format!(
                "unknown strategy `{other}` (expected naive, symmetric or gpu)"
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMode {
    Serial,
    #[default]
    Parallel,
}

/// Everything fixed at run start
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    #[serde(flatten)]
    pub law: ForceLaw,
    pub dt: f32,
    pub strategy: Strategy,
    /// CPU strategy used when the accelerator cannot be acquired. Never implied.
    pub gpu_fallback: Option<Strategy>,
    pub tile_size: u32,
    pub chunk_size: usize,
    /// Worker threads; 0 means one per logical CPU
    pub threads: usize,
    pub integration: IntegrationMode,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            law: ForceLaw::default(),
            dt: DT_DEFAULT,
            strategy: Strategy::Symmetric,
            gpu_fallback: None,
            tile_size: TILE_SIZE_DEFAULT,
            chunk_size: CHUNK_SIZE_DEFAULT,
            threads: 0,
            integration: IntegrationMode::Parallel,
        }
    }
}

fn positive(name: &str, value: f32) -> Result<(), SimulationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimulationError::config(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}

impl SimulationParams {
    /// Reject anything that would make a tick meaningless. Called before the first tick.
    pub fn validate(&self) -> Result<(), SimulationError> {
        positive("dt", self.dt)?;
        positive("g", self.law.g)?;
        positive("softening", self.law.softening)?;

        if self.chunk_size == 0 {
            return Err(SimulationError::config("chunk_size must be at least 1"));
        }
        if !(1..=TILE_SIZE_MAX).contains(&self.tile_size) {
            return Err(SimulationError::config(format!(
                "tile_size must be in 1..={TILE_SIZE_MAX}, got {}",
                self.tile_size
            )));
        }
        if self.gpu_fallback == Some(Strategy::Gpu) {
            return Err(SimulationError::config(
                "gpu_fallback must name a CPU strategy",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimulationParams::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_constants() {
        let cases: [fn(&mut SimulationParams); 6] = [
            |p| p.dt = 0.0,
            |p| p.dt = -0.01,
            |p| p.law.softening = f32::NAN,
            |p| p.chunk_size = 0,
            |p| p.tile_size = 512,
            |p| p.gpu_fallback = Some(Strategy::Gpu),
        ];
        for mutate in cases {
            let mut params = SimulationParams::default();
            mutate(&mut params);
            assert!(matches!(
                params.validate(),
                Err(SimulationError::Config(_))
            ));
        }
    }

    #[test]
    fn strategy_names_parse_back() {
        for strategy in [Strategy::Naive, Strategy::Symmetric, Strategy::Gpu] {
            assert_eq!(strategy.name().parse::<Strategy>(), Ok(strategy));
        }
        assert!("barnes-hut".parse::<Strategy>().is_err());
    }

    #[test]
    fn uniform_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<GpuParams>(), 16);
    }
}
