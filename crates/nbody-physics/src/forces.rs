//! Softened Newtonian gravity between two point masses
//!
//! Every force strategy (CPU and GPU) evaluates exactly this expression, so the
//! results only differ in accumulation order.

use crate::constants::{G_DEFAULT, SOFTENING_DEFAULT};
use crate::particle::Particle;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Gravitational constant and softening for one run
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceLaw {
    pub g: f32,
    pub softening: f32,
}

impl Default for ForceLaw {
    fn default() -> Self {
        Self {
            g: G_DEFAULT,
            softening: SOFTENING_DEFAULT,
        }
    }
}

impl ForceLaw {
    pub fn new(g: f32, softening: f32) -> Self {
        Self { g, softening }
    }

    /// Force on `a` exerted by `b`, pointing from `a` toward `b`.
    #[inline]
    pub fn force(&self, a: &Particle, b: &Particle) -> Vec3 {
        self.between(a.position(), a.mass(), b.position(), b.mass())
    }

    /// F = G * ma * mb / (r² + ε), along the unit vector from a to b.
    ///
    /// Coincident positions give a zero vector rather than NaN because the
    /// softened distance never reaches zero.
    #[inline]
    pub fn between(&self, pa: Vec3, ma: f32, pb: Vec3, mb: f32) -> Vec3 {
        let diff = pb - pa;
        let dist_sq = diff.dot(diff) + self.softening;
        let dist = dist_sq.sqrt();
        let magnitude = self.g * ma * mb / dist_sq;
        (diff / dist) * magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(distance: f32, m1: f32, m2: f32) -> (Particle, Particle) {
        (
            Particle::at_rest(Vec3::new(-distance / 2.0, 0.0, 0.0), m1),
            Particle::at_rest(Vec3::new(distance / 2.0, 0.0, 0.0), m2),
        )
    }

    #[test]
    fn newton_third_law_is_exact() {
        let law = ForceLaw::new(0.1, 1e-4);
        let a = Particle::at_rest(Vec3::new(0.3, -1.7, 2.2), 2.0);
        let b = Particle::at_rest(Vec3::new(-4.1, 0.9, 0.05), 3.0);

        let ab = law.force(&a, &b);
        let ba = law.force(&b, &a);
        assert_eq!(ab, -ba);
    }

    #[test]
    fn points_toward_other_body() {
        let law = ForceLaw::new(1.0, 1e-3);
        let (a, b) = pair(2.0, 1.0, 1.0);
        let f = law.force(&a, &b);
        assert!(f.dot(b.position() - a.position()) > 0.0);
        assert_eq!(f.y, 0.0);
        assert_eq!(f.z, 0.0);
    }

    #[test]
    fn inverse_square() {
        let law = ForceLaw::new(0.1, 0.0);
        let (a1, b1) = pair(1.0, 1.0, 1.0);
        let (a2, b2) = pair(2.0, 1.0, 1.0);
        let ratio = law.force(&a1, &b1).length() / law.force(&a2, &b2).length();
        assert!((ratio - 4.0).abs() < 1e-4, "expected ~4x, got {ratio}");
    }

    #[test]
    fn magnitude_matches_formula() {
        let law = ForceLaw::new(0.01, 0.001);
        let (a, b) = pair(1.0, 2.0, 5.0);
        // Unit direction is taken over the softened distance, so |diff| / dist < 1.
        let dist_sq: f32 = 1.0 + 0.001;
        let expected = 0.01 * 2.0 * 5.0 / dist_sq / dist_sq.sqrt();
        let actual = law.force(&a, &b).length();
        assert!((actual - expected).abs() < 1e-6 * expected);
    }

    #[test]
    fn coincident_particles_stay_finite() {
        let law = ForceLaw::new(1.0, 1e-3);
        let a = Particle::at_rest(Vec3::ONE, 1.0);
        let f = law.force(&a, &a);
        assert!(f.is_finite());
        assert_eq!(f, Vec3::ZERO);
    }
}
