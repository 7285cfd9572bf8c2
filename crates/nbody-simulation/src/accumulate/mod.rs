//! Force accumulation strategies
//!
//! Every strategy fills the same [`ForceTable`] from the same read-only
//! [`ParticleStore`]; they differ only in how the O(N²) sum is scheduled.

mod naive;
mod symmetric;

pub use naive::NaiveAccumulator;
pub use symmetric::{PairForceTable, SymmetricAccumulator};

use crate::gpu::GpuForceReducer;
use crate::SimulationError;
use glam::Vec3;
use nbody_physics::ParticleStore;

/// Net force per particle, rebuilt from zero every tick
#[derive(Clone, Debug)]
pub struct ForceTable {
    forces: Vec<Vec3>,
}

impl ForceTable {
    pub fn new(particle_count: usize) -> Self {
        Self {
            forces: vec![Vec3::ZERO; particle_count],
        }
    }

    pub fn reset(&mut self) {
        self.forces.fill(Vec3::ZERO);
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    pub fn get(&self, index: usize) -> Vec3 {
        self.forces[index]
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.forces
    }

    pub fn as_mut_slice(&mut self) -> &mut [Vec3] {
        &mut self.forces
    }
}

/// One way of computing every particle's net force.
pub trait ForceAccumulator {
    fn name(&self) -> &'static str;

    /// Overwrite `forces` with the net force on each particle of `store`.
    ///
    /// `store` is only read; `forces` has one cell per particle.
    fn accumulate(
        &mut self,
        store: &ParticleStore,
        forces: &mut ForceTable,
    ) -> Result<(), SimulationError>;
}

/// The strategy picked at startup
pub enum AnyAccumulator {
    Naive(NaiveAccumulator),
    Symmetric(SymmetricAccumulator),
    Gpu(GpuForceReducer),
}

impl ForceAccumulator for AnyAccumulator {
    fn name(&self) -> &'static str {
        match self {
            AnyAccumulator::Naive(a) => a.name(),
            AnyAccumulator::Symmetric(a) => a.name(),
            AnyAccumulator::Gpu(a) => a.name(),
        }
    }

    fn accumulate(
        &mut self,
        store: &ParticleStore,
        forces: &mut ForceTable,
    ) -> Result<(), SimulationError> {
        match self {
            AnyAccumulator::Naive(a) => a.accumulate(store, forces),
            AnyAccumulator::Symmetric(a) => a.accumulate(store, forces),
            AnyAccumulator::Gpu(a) => a.accumulate(store, forces),
        }
    }
}

impl From<NaiveAccumulator> for AnyAccumulator {
    fn from(value: NaiveAccumulator) -> Self {
        AnyAccumulator::Naive(value)
    }
}

impl From<SymmetricAccumulator> for AnyAccumulator {
    fn from(value: SymmetricAccumulator) -> Self {
        AnyAccumulator::Symmetric(value)
    }
}

impl From<GpuForceReducer> for AnyAccumulator {
    fn from(value: GpuForceReducer) -> Self {
        AnyAccumulator::Gpu(value)
    }
}

/// Guard shared by the strategies: table and store must agree on N.
pub(crate) fn check_table(
    store: &ParticleStore,
    forces: &ForceTable,
) -> Result<(), SimulationError> {
    if forces.len() != store.len() {
        return Err(SimulationError::config(format!(
            "force table holds {} cells for {} particles",
            forces.len(),
            store.len()
        )));
    }
    Ok(())
}
