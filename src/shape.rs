//! Morph-target sampling.
//!
//! Every shape maps particle id `i` to a target point. The sphere is a
//! deterministic Fibonacci spiral; the other shapes draw random parameters,
//! so repeated calls for the same shape are not continuous with each other.
//! Targets are packed into a square RGBA float texture (row-major by id) that
//! the simulation kernel reads with `textureLoad`.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{PI, TAU};
use std::fmt;

/// The closed set of morph targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShapeKind {
    #[default]
    Sphere,
    Cube,
    Torus,
    Heart,
}

impl ShapeKind {
    /// All shapes, in selector order.
    pub const ALL: [ShapeKind; 4] = [
        ShapeKind::Sphere,
        ShapeKind::Cube,
        ShapeKind::Torus,
        ShapeKind::Heart,
    ];

    /// Lower-case name, as used by selectors.
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Sphere => "sphere",
            ShapeKind::Cube => "cube",
            ShapeKind::Torus => "torus",
            ShapeKind::Heart => "heart",
        }
    }

    /// Parse a selector name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Target point for particle `index` out of `count`, on a shape of unit scale.
    fn point<R: Rng>(self, index: u32, count: u32, rng: &mut R) -> Vec3 {
        match self {
            ShapeKind::Sphere => sphere_point(index, count),
            ShapeKind::Cube => cube_point(rng),
            ShapeKind::Torus => torus_point(rng),
            ShapeKind::Heart => heart_point(rng),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Golden-angle spiral: `phi = acos(1 - 2(i + 0.5)/n)`, `theta = pi(1 + sqrt 5) i`.
fn sphere_point(index: u32, count: u32) -> Vec3 {
    let i = index as f32;
    let n = count.max(1) as f32;
    let phi = (1.0 - 2.0 * (i + 0.5) / n).clamp(-1.0, 1.0).acos();
    // The golden-angle product grows with the index; reduce it in f64
    let golden = std::f64::consts::PI * (1.0 + 5.0_f64.sqrt());
    let theta = ((golden * f64::from(index)) % std::f64::consts::TAU) as f32;
    Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin())
}

fn cube_point<R: Rng>(rng: &mut R) -> Vec3 {
    const HALF: f32 = 0.8;
    let face = rng.gen_range(0..6u32);
    let u = rng.gen_range(-HALF..HALF);
    let v = rng.gen_range(-HALF..HALF);
    let side = if face % 2 == 0 { HALF } else { -HALF };
    match face / 2 {
        0 => Vec3::new(side, u, v),
        1 => Vec3::new(u, side, v),
        _ => Vec3::new(u, v, side),
    }
}

fn torus_point<R: Rng>(rng: &mut R) -> Vec3 {
    const MAJOR: f32 = 0.7;
    const MINOR: f32 = 0.3;
    let major = rng.gen_range(0.0..TAU);
    let minor = rng.gen_range(0.0..TAU);
    let ring = MAJOR + MINOR * minor.cos();
    Vec3::new(ring * major.cos(), MINOR * minor.sin(), ring * major.sin())
}

/// Classic heart outline `(16 sin^3 u, 13 cos u - 5 cos 2u - 2 cos 3u - cos 4u)`
/// swept through a second angle to give it depth.
fn heart_point<R: Rng>(rng: &mut R) -> Vec3 {
    const SCALE: f32 = 1.0 / 17.0;
    let u = rng.gen_range(0.0..TAU);
    let v = rng.gen_range(0.0..PI);
    let sweep = v.sin();
    let x = 16.0 * u.sin().powi(3);
    let y = 13.0 * u.cos() - 5.0 * (2.0 * u).cos() - 2.0 * (3.0 * u).cos() - (4.0 * u).cos();
    let z = 6.0 * v.cos();
    Vec3::new(x * sweep, y * sweep, z) * SCALE
}

/// Produces target point sequences for each [`ShapeKind`].
#[derive(Debug, Clone)]
pub struct ShapeSampler {
    rng: SmallRng,
    scale: f32,
}

impl ShapeSampler {
    /// Create a sampler with a fixed seed and world-space shape scale.
    pub fn new(seed: u64, scale: f32) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            scale,
        }
    }

    /// Sample `count` target points; index `i` is the target for particle id `i`.
    pub fn sample(&mut self, kind: ShapeKind, count: u32) -> Vec<Vec3> {
        let scale = self.scale;
        let rng = &mut self.rng;
        (0..count)
            .map(|i| kind.point(i, count, rng) * scale)
            .collect()
    }
}

/// Side length of the square texture holding `count` targets: `ceil(sqrt(count))`.
///
/// An empty pool still gets a 1x1 texture so the GPU binding stays valid.
pub fn texture_side(count: u32) -> u32 {
    let mut side = (count as f64).sqrt().ceil() as u32;
    while (side as u64) * (side as u64) < count as u64 {
        side += 1;
    }
    while side > 1 && ((side - 1) as u64) * ((side - 1) as u64) >= count as u64 {
        side -= 1;
    }
    side.max(1)
}

/// Targets encoded as RGBA32F texels, row-major by particle id.
///
/// Texel `i` holds `(x, y, z, 1)` for `i < count`; padding texels are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTexture {
    side: u32,
    count: u32,
    texels: Vec<[f32; 4]>,
}

impl ShapeTexture {
    /// Pack a target sequence.
    pub fn encode(points: &[Vec3]) -> Self {
        let count = points.len() as u32;
        let side = texture_side(count);
        let mut texels = vec![[0.0; 4]; (side * side) as usize];
        for (texel, point) in texels.iter_mut().zip(points) {
            *texel = [point.x, point.y, point.z, 1.0];
        }
        Self {
            side,
            count,
            texels,
        }
    }

    /// Texture width and height.
    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Number of encoded targets.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Texel coordinate holding the target for `id`.
    #[inline]
    pub fn coord(&self, id: u32) -> (u32, u32) {
        (id % self.side, id / self.side)
    }

    /// Read back the target for `id`, as the simulation kernel does.
    pub fn decode(&self, id: u32) -> Vec3 {
        let (x, y) = self.coord(id);
        let texel = self.texels[(y * self.side + x) as usize];
        Vec3::new(texel[0], texel[1], texel[2])
    }

    /// Raw texels, `side * side` entries.
    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    /// Texel bytes ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    /// Bytes per texel row.
    pub fn bytes_per_row(&self) -> u32 {
        self.side * std::mem::size_of::<[f32; 4]>() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_length_matches_count() {
        let mut sampler = ShapeSampler::new(1, 1.0);
        for kind in ShapeKind::ALL {
            for count in [0, 1, 7, 100] {
                assert_eq!(sampler.sample(kind, count).len(), count as usize);
            }
        }
    }

    #[test]
    fn test_sphere_is_deterministic_and_on_surface() {
        let mut a = ShapeSampler::new(1, 0.5);
        let mut b = ShapeSampler::new(99, 0.5);
        let pa = a.sample(ShapeKind::Sphere, 256);
        let pb = b.sample(ShapeKind::Sphere, 256);
        assert_eq!(pa, pb);
        for p in &pa {
            assert!((p.length() - 0.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_sphere_spiral_keeps_precision_at_high_index() {
        let count = 16_384u32;
        let golden = std::f64::consts::PI * (1.0 + 5.0_f64.sqrt());
        for index in (0..count).step_by(97).chain([count - 1]) {
            let i = f64::from(index);
            let phi = (1.0 - 2.0 * (i + 0.5) / f64::from(count)).acos();
            let theta = golden * i;
            let exact = glam::DVec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            let p = sphere_point(index, count).as_dvec3();
            assert!(p.distance(exact) < 1e-4, "index {}: {:?} vs {:?}", index, p, exact);
        }
    }

    #[test]
    fn test_sphere_covers_both_poles() {
        let mut sampler = ShapeSampler::new(0, 1.0);
        let points = sampler.sample(ShapeKind::Sphere, 1000);
        let max_y = points.iter().map(|p| p.y).fold(f32::MIN, f32::max);
        let min_y = points.iter().map(|p| p.y).fold(f32::MAX, f32::min);
        assert!(max_y > 0.99);
        assert!(min_y < -0.99);
        // Uniform coverage: the upper hemisphere holds half the points
        let upper = points.iter().filter(|p| p.y > 0.0).count();
        assert_eq!(upper, 500);
    }

    #[test]
    fn test_cube_points_on_a_face() {
        let mut sampler = ShapeSampler::new(4, 1.0);
        for p in sampler.sample(ShapeKind::Cube, 500) {
            let m = p.abs().max_element();
            assert!((m - 0.8).abs() < 1e-5, "{p:?} is not on the cube surface");
        }
    }

    #[test]
    fn test_torus_distance_from_ring() {
        let mut sampler = ShapeSampler::new(5, 1.0);
        for p in sampler.sample(ShapeKind::Torus, 500) {
            let ring = (p.x * p.x + p.z * p.z).sqrt() - 0.7;
            let tube = (ring * ring + p.y * p.y).sqrt();
            assert!((tube - 0.3).abs() < 1e-4);
        }
    }

    #[test]
    fn test_heart_is_bounded_and_finite() {
        let mut sampler = ShapeSampler::new(6, 1.0);
        for p in sampler.sample(ShapeKind::Heart, 500) {
            assert!(p.is_finite());
            assert!(p.abs().max_element() <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn test_texture_side() {
        assert_eq!(texture_side(0), 1);
        assert_eq!(texture_side(1), 1);
        assert_eq!(texture_side(2), 2);
        assert_eq!(texture_side(4), 2);
        assert_eq!(texture_side(5), 3);
        assert_eq!(texture_side(10_000), 100);
        assert_eq!(texture_side(10_001), 101);
    }

    #[test]
    fn test_texture_round_trip_and_zero_padding() {
        let mut sampler = ShapeSampler::new(8, 0.6);
        let points = sampler.sample(ShapeKind::Torus, 10);
        let texture = ShapeTexture::encode(&points);

        assert_eq!(texture.side(), 4);
        assert_eq!(texture.texels().len(), 16);
        for (id, point) in points.iter().enumerate() {
            assert_eq!(texture.decode(id as u32), *point);
        }
        for texel in &texture.texels()[10..] {
            assert_eq!(*texel, [0.0; 4]);
        }
        assert_eq!(texture.as_bytes().len(), 16 * 16);
        assert_eq!(texture.bytes_per_row(), 64);
    }

    #[test]
    fn test_shape_names() {
        for kind in ShapeKind::ALL {
            assert_eq!(ShapeKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ShapeKind::from_name("pyramid"), None);
    }
}
