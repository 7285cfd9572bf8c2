//! Point masses and the store that owns them for the lifetime of a run

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use thiserror::Error;

/// A single point mass.
///
/// Laid out like the WGSL side expects (position and mass share one vec4), so
/// a slice of particles can be handed to bytemuck without conversion.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Position in 3D space
    pub position: [f32; 3],
    mass: f32,
    /// Velocity vector
    pub velocity: [f32; 3],
    _padding: f32,
}

impl Particle {
    pub fn new(position: Vec3, velocity: Vec3, mass: f32) -> Self {
        Self {
            position: position.to_array(),
            mass,
            velocity: velocity.to_array(),
            _padding: 0.0,
        }
    }

    /// Particle at rest
    pub fn at_rest(position: Vec3, mass: f32) -> Self {
        Self::new(position, Vec3::ZERO, mass)
    }

    /// Mass is fixed at creation.
    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        Vec3::from_array(self.velocity)
    }

    /// Semi-implicit Euler step: velocity first, then position with the new velocity.
    #[inline]
    pub fn advance(&mut self, force: Vec3, dt: f32) {
        let velocity = self.velocity() + (force / self.mass) * dt;
        let position = self.position() + velocity * dt;
        self.velocity = velocity.to_array();
        self.position = position.to_array();
    }
}

/// Rejected initial states
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("a simulation needs at least one particle")]
    Empty,
    #[error("{0} particles do not fit the 32-bit particle count of the frame format")]
    TooMany(usize),
    #[error("particle {index} has mass {mass}; masses must be finite and positive")]
    InvalidMass { index: usize, mass: f32 },
    #[error("particle {index} has a non-finite position or velocity")]
    NonFinite { index: usize },
}

/// Authoritative per-tick state of all bodies.
///
/// The particle count is fixed at construction; the store hands out a shared
/// slice for the force phase and a mutable one for integration.
#[derive(Clone, Debug)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    pub fn new(particles: Vec<Particle>) -> Result<Self, StoreError> {
        if particles.is_empty() {
            return Err(StoreError::Empty);
        }
        if particles.len() > i32::MAX as usize {
            return Err(StoreError::TooMany(particles.len()));
        }
        for (index, p) in particles.iter().enumerate() {
            if !(p.mass.is_finite() && p.mass > 0.0) {
                return Err(StoreError::InvalidMass {
                    index,
                    mass: p.mass,
                });
            }
            let finite = p
                .position
                .iter()
                .chain(p.velocity.iter())
                .all(|c| c.is_finite());
            if !finite {
                return Err(StoreError::NonFinite { index });
            }
        }
        Ok(Self { particles })
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Always false: construction rejects empty sets.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable view for the integration phase. The slice cannot grow or shrink.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Copy positions in index order into `frame`, replacing its contents.
    pub fn positions_into(&self, frame: &mut Vec<[f32; 3]>) {
        frame.clear();
        frame.extend(self.particles.iter().map(|p| p.position));
    }

    pub fn total_mass(&self) -> f32 {
        self.particles.iter().map(|p| p.mass).sum()
    }

    pub fn center_of_mass(&self) -> Vec3 {
        let weighted: Vec3 = self
            .particles
            .iter()
            .map(|p| p.position() * p.mass)
            .sum();
        weighted / self.total_mass()
    }

    pub fn total_momentum(&self) -> Vec3 {
        self.particles.iter().map(|p| p.velocity() * p.mass).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_matches_gpu_layout() {
        assert_eq!(std::mem::size_of::<Particle>(), 32);
    }

    #[test]
    fn advance_updates_velocity_before_position() {
        let mut p = Particle::at_rest(Vec3::ZERO, 2.0);
        p.advance(Vec3::new(4.0, 0.0, 0.0), 0.5);
        // v = 4/2 * 0.5 = 1, x = 1 * 0.5
        assert_eq!(p.velocity(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(p.position(), Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn store_rejects_bad_states() {
        assert_eq!(ParticleStore::new(vec![]).unwrap_err(), StoreError::Empty);

        let zero_mass = vec![Particle::at_rest(Vec3::ZERO, 0.0)];
        assert!(matches!(
            ParticleStore::new(zero_mass),
            Err(StoreError::InvalidMass { index: 0, .. })
        ));

        let nan = vec![
            Particle::at_rest(Vec3::ZERO, 1.0),
            Particle::at_rest(Vec3::new(f32::NAN, 0.0, 0.0), 1.0),
        ];
        assert_eq!(
            ParticleStore::new(nan).unwrap_err(),
            StoreError::NonFinite { index: 1 }
        );
    }

    #[test]
    fn diagnostics() {
        let store = ParticleStore::new(vec![
            Particle::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::Y, 1.0),
            Particle::new(Vec3::new(3.0, 0.0, 0.0), -Vec3::Y, 3.0),
        ])
        .unwrap();

        assert_eq!(store.total_mass(), 4.0);
        assert_eq!(store.center_of_mass(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(store.total_momentum(), Vec3::new(0.0, -2.0, 0.0));

        let mut frame = vec![[9.0; 3]; 7];
        store.positions_into(&mut frame);
        assert_eq!(frame, vec![[-1.0, 0.0, 0.0], [3.0, 0.0, 0.0]]);
    }
}
