//! Particle layout shared by the CPU reference path and the GPU kernels.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::Rng;
use std::f32::consts::TAU;

/// One particle as stored in the simulation buffers.
///
/// The layout matches the WGSL struct in [`Particle::WGSL_STRUCT`]:
/// `vec3` members are 16-byte aligned, so `id` and `_pad` fill the tail of
/// each row.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// World-space position.
    pub position: Vec3,
    /// Stable identifier in `0..N`, written once at construction.
    pub id: u32,
    /// World-space velocity.
    pub velocity: Vec3,
    pub _pad: u32,
}

impl Particle {
    /// WGSL declaration matching this struct's memory layout.
    pub const WGSL_STRUCT: &'static str = r#"struct Particle {
    position: vec3<f32>,
    id: u32,
    velocity: vec3<f32>,
    _pad: u32,
};"#;

    /// Byte stride between consecutive particles.
    pub const STRIDE: u64 = std::mem::size_of::<Particle>() as u64;

    pub fn new(id: u32, position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            id,
            velocity,
            _pad: 0,
        }
    }

    /// Current speed.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Whether position and velocity contain only finite values.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// Procedurally sample the startup particle pool.
///
/// Positions are uniform inside a sphere whose radius is half the smallest
/// box half-extent; velocities are small and random. Particle `i` gets id `i`.
pub fn spawn_particles<R: Rng>(count: u32, half_bounds: Vec3, rng: &mut R) -> Vec<Particle> {
    let radius = 0.5 * half_bounds.min_element();
    (0..count)
        .map(|id| {
            let position = random_in_sphere(rng, radius);
            let velocity = random_direction(rng) * rng.gen_range(0.0_f32..0.25);
            Particle::new(id, position, velocity)
        })
        .collect()
}

fn random_in_sphere<R: Rng>(rng: &mut R, radius: f32) -> Vec3 {
    // Cube root keeps the density uniform through the volume
    let r = radius * rng.gen::<f32>().cbrt();
    random_direction(rng) * r
}

fn random_direction<R: Rng>(rng: &mut R) -> Vec3 {
    let theta = rng.gen_range(0.0..TAU);
    let cos_phi: f32 = rng.gen_range(-1.0..1.0);
    let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
    Vec3::new(sin_phi * theta.cos(), cos_phi, sin_phi * theta.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_particle_layout() {
        assert_eq!(std::mem::size_of::<Particle>(), 32);
        assert_eq!(Particle::STRIDE, 32);
        assert_eq!(std::mem::offset_of!(Particle, id), 12);
        assert_eq!(std::mem::offset_of!(Particle, velocity), 16);
    }

    #[test]
    fn test_spawn_ids_and_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);
        let half_bounds = Vec3::new(1.0, 2.0, 1.5);
        let particles = spawn_particles(500, half_bounds, &mut rng);

        assert_eq!(particles.len(), 500);
        for (i, p) in particles.iter().enumerate() {
            assert_eq!(p.id, i as u32);
            assert!(p.is_finite());
            assert!(p.position.length() <= 0.5 + 1e-5);
            assert!(p.speed() <= 0.25 + 1e-5);
        }
    }

    #[test]
    fn test_spawn_is_reproducible() {
        let a = spawn_particles(32, Vec3::ONE, &mut SmallRng::seed_from_u64(3));
        let b = spawn_particles(32, Vec3::ONE, &mut SmallRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
