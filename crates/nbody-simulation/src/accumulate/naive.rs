use super::{check_table, ForceAccumulator, ForceTable};
use crate::SimulationError;
use glam::Vec3;
use nbody_physics::{ForceLaw, ParticleStore};
use rayon::prelude::*;
use std::sync::Arc;

/// Each worker owns one destination cell and sums over every other particle.
pub struct NaiveAccumulator {
    pool: Arc<rayon::ThreadPool>,
    law: ForceLaw,
}

impl NaiveAccumulator {
    pub fn new(pool: Arc<rayon::ThreadPool>, law: ForceLaw) -> Self {
        Self { pool, law }
    }
}

impl ForceAccumulator for NaiveAccumulator {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn accumulate(
        &mut self,
        store: &ParticleStore,
        forces: &mut ForceTable,
    ) -> Result<(), SimulationError> {
        check_table(store, forces)?;
        let particles = store.particles();
        let law = self.law;

        self.pool.install(|| {
            forces
                .as_mut_slice()
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, net)| {
                    let a = &particles[i];
                    let mut sum = Vec3::ZERO;
                    for (j, b) in particles.iter().enumerate() {
                        if j != i {
                            sum += law.force(a, b);
                        }
                    }
                    *net = sum;
                });
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbody_physics::Particle;

    #[test]
    fn matches_serial_double_loop() {
        let pool = Arc::new(rayon::ThreadPoolBuilder::new().num_threads(3).build().unwrap());
        let law = ForceLaw::new(0.5, 1e-3);
        let store = ParticleStore::new(
            (0..9)
                .map(|i| {
                    let t = i as f32;
                    Particle::at_rest(Vec3::new(t.sin() * 3.0, t * 0.5, -t), 1.0 + t)
                })
                .collect(),
        )
        .unwrap();

        let mut forces = ForceTable::new(store.len());
        NaiveAccumulator::new(pool, law)
            .accumulate(&store, &mut forces)
            .unwrap();

        let particles = store.particles();
        for i in 0..particles.len() {
            let mut expected = Vec3::ZERO;
            for j in 0..particles.len() {
                if i != j {
                    expected += law.force(&particles[i], &particles[j]);
                }
            }
            // same summation order, so bit-identical
            assert_eq!(forces.get(i), expected);
        }
    }
}
