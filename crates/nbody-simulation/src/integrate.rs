use crate::accumulate::ForceTable;
use crate::params::IntegrationMode;
use crate::SimulationError;
use nbody_physics::ParticleStore;
use rayon::prelude::*;

/// Semi-implicit Euler: velocity from the net force, then position from the new velocity.
#[derive(Clone, Copy, Debug)]
pub struct Integrator {
    dt: f32,
    mode: IntegrationMode,
}

impl Integrator {
    pub fn new(dt: f32, mode: IntegrationMode) -> Self {
        Self { dt, mode }
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn mode(&self) -> IntegrationMode {
        self.mode
    }

    /// Advance every particle by one step of `dt`.
    pub fn apply(
        &self,
        pool: &rayon::ThreadPool,
        store: &mut ParticleStore,
        forces: &ForceTable,
    ) -> Result<(), SimulationError> {
        if forces.len() != store.len() {
            return Err(SimulationError::config(format!(
                "force table holds {} cells for {} particles",
                forces.len(),
                store.len()
            )));
        }

        let dt = self.dt;
        let particles = store.particles_mut();
        let forces = forces.as_slice();

        match self.mode {
            IntegrationMode::Serial => {
                for (particle, force) in particles.iter_mut().zip(forces) {
                    particle.advance(*force, dt);
                }
            }
            IntegrationMode::Parallel => pool.install(|| {
                particles
                    .par_iter_mut()
                    .zip(forces.par_iter())
                    .for_each(|(particle, force)| particle.advance(*force, dt));
            }),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use nbody_physics::Particle;

    #[test]
    fn velocity_updates_before_position() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let mut store = ParticleStore::new(vec![Particle::at_rest(Vec3::ZERO, 2.0)]).unwrap();
        let mut forces = ForceTable::new(1);
        forces.as_mut_slice()[0] = Vec3::new(4.0, 0.0, 0.0);

        Integrator::new(0.5, IntegrationMode::Serial)
            .apply(&pool, &mut store, &forces)
            .unwrap();

        let p = store.particles()[0];
        // v = 4 / 2 * 0.5 = 1, x = 1 * 0.5
        assert_eq!(p.velocity(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(p.position(), Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn modes_agree_exactly() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
        let particles: Vec<_> = (0..50)
            .map(|i| {
                let t = i as f32;
                Particle::new(Vec3::splat(t), Vec3::new(0.0, t * 0.1, 1.0), 1.0 + t)
            })
            .collect();
        let mut forces = ForceTable::new(50);
        for (i, f) in forces.as_mut_slice().iter_mut().enumerate() {
            *f = Vec3::new(i as f32, -1.0, 0.25);
        }

        let mut serial = ParticleStore::new(particles.clone()).unwrap();
        let mut parallel = ParticleStore::new(particles).unwrap();
        Integrator::new(0.01, IntegrationMode::Serial)
            .apply(&pool, &mut serial, &forces)
            .unwrap();
        Integrator::new(0.01, IntegrationMode::Parallel)
            .apply(&pool, &mut parallel, &forces)
            .unwrap();

        assert_eq!(serial.particles(), parallel.particles());
    }
}
