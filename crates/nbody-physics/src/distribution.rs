//! Initial conditions
//!
//! Generators are seeded so that a run can be reproduced bit for bit.

use crate::particle::Particle;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Explicitly configured body
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    pub position: [f32; 3],
    #[serde(default)]
    pub velocity: [f32; 3],
    pub mass: f32,
}

impl From<BodyConfig> for Particle {
    fn from(body: BodyConfig) -> Self {
        Particle::new(
            Vec3::from_array(body.position),
            Vec3::from_array(body.velocity),
            body.mass,
        )
    }
}

/// Procedural initial state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Uniform points in a ball, at rest
    Sphere {
        count: usize,
        radius: f32,
        mass_min: f32,
        mass_max: f32,
        seed: u64,
    },
    /// Flat disk orbiting a heavy central body (index 0)
    Disk {
        count: usize,
        radius: f32,
        central_mass: f32,
        mass: f32,
        seed: u64,
    },
}

impl Distribution {
    pub fn count(&self) -> usize {
        match self {
            Distribution::Sphere { count, .. } | Distribution::Disk { count, .. } => *count,
        }
    }

    /// Generate the particles. `g` is only used for orbital speeds.
    pub fn generate(&self, g: f32) -> Vec<Particle> {
        match *self {
            Distribution::Sphere {
                count,
                radius,
                mass_min,
                mass_max,
                seed,
            } => sphere(count, radius, mass_min, mass_max, seed),
            Distribution::Disk {
                count,
                radius,
                central_mass,
                mass,
                seed,
            } => disk(count, radius, central_mass, mass, g, seed),
        }
    }
}

fn sample_mass(rng: &mut StdRng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.random_range(min..max)
    } else {
        min
    }
}

fn sphere(count: usize, radius: f32, mass_min: f32, mass_max: f32, seed: u64) -> Vec<Particle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut particles = Vec::with_capacity(count);

    for _ in 0..count {
        let theta = rng.random::<f32>() * std::f32::consts::TAU;
        let cos_phi = rng.random::<f32>() * 2.0 - 1.0;
        let sin_phi = (1.0 - cos_phi * cos_phi).sqrt();
        // Cube root keeps the density uniform in volume
        let r = rng.random::<f32>().powf(1.0 / 3.0) * radius;

        let pos = Vec3::new(
            r * sin_phi * theta.cos(),
            r * sin_phi * theta.sin(),
            r * cos_phi,
        );
        let mass = sample_mass(&mut rng, mass_min, mass_max);
        particles.push(Particle::at_rest(pos, mass));
    }

    particles
}

fn disk(count: usize, radius: f32, central_mass: f32, mass: f32, g: f32, seed: u64) -> Vec<Particle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut particles = Vec::with_capacity(count);
    if count == 0 {
        return particles;
    }

    particles.push(Particle::at_rest(Vec3::ZERO, central_mass));

    let inner = radius * 0.05;
    for _ in 1..count {
        let theta = rng.random::<f32>() * std::f32::consts::TAU;
        let r = inner + rng.random::<f32>() * (radius - inner);
        let (sin, cos) = theta.sin_cos();
        let pos = Vec3::new(r * cos, r * sin, 0.0);

        let speed = (g * central_mass / r).sqrt();
        let vel = Vec3::new(-sin, cos, 0.0) * speed;
        particles.push(Particle::new(pos, vel, mass));
    }

    particles
}
