//! Active morph target and the attraction ramp that follows a shape switch.

use log::info;

use crate::shape::{ShapeKind, ShapeSampler, ShapeTexture};

/// Linear ramp of the shape-attraction factor.
///
/// A shape switch resets the ramp to zero; from there it grows at `rate` per
/// second and holds at `target`. Elapsed time is summed in `f64`, where the
/// `f32` step lengths add without rounding, and the value is formed there
/// before narrowing. It is therefore `min(target, rate * t)` for the exact
/// sum `t` of the steps taken.
#[derive(Debug, Clone, PartialEq)]
pub struct AttractionRamp {
    elapsed: f64,
    rate: f32,
    target: f32,
}

impl AttractionRamp {
    pub fn new(rate: f32, target: f32) -> Self {
        Self {
            elapsed: 0.0,
            rate,
            target,
        }
    }

    /// Restart from zero.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    /// Advance by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if self.value() < self.target {
            self.elapsed += f64::from(dt.max(0.0));
        }
    }

    /// Current attraction factor.
    pub fn value(&self) -> f32 {
        (f64::from(self.rate) * self.elapsed).min(f64::from(self.target)) as f32
    }

    /// Seconds since the last reset, frozen once the target is reached.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

/// The current shape, its encoded targets, and the attraction ramp.
#[derive(Debug, Clone)]
pub struct MorphState {
    sampler: ShapeSampler,
    shape: ShapeKind,
    count: u32,
    texture: ShapeTexture,
    ramp: AttractionRamp,
    dirty: bool,
}

impl MorphState {
    /// Sample `shape` for `count` particles and start the ramp from zero.
    pub fn new(mut sampler: ShapeSampler, shape: ShapeKind, count: u32, ramp: AttractionRamp) -> Self {
        let texture = ShapeTexture::encode(&sampler.sample(shape, count));
        Self {
            sampler,
            shape,
            count,
            texture,
            ramp,
            dirty: true,
        }
    }

    /// Switch to `shape`: re-sample targets and reset attraction to zero.
    ///
    /// Selecting the active shape again also re-samples, which re-rolls the
    /// random shapes.
    pub fn switch_to(&mut self, shape: ShapeKind) {
        info!("Morphing to {}", shape);
        self.shape = shape;
        self.texture = ShapeTexture::encode(&self.sampler.sample(shape, self.count));
        self.ramp.reset();
        self.dirty = true;
    }

    /// Advance the attraction ramp.
    pub fn advance(&mut self, dt: f32) {
        self.ramp.advance(dt);
    }

    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    pub fn attraction(&self) -> f32 {
        self.ramp.value()
    }

    pub fn texture(&self) -> &ShapeTexture {
        &self.texture
    }

    /// Returns `true` once after each re-sample, for GPU re-upload.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_is_linear_then_clamped() {
        let mut ramp = AttractionRamp::new(0.5, 1.0);
        assert_eq!(ramp.value(), 0.0);
        ramp.advance(0.5);
        assert_eq!(ramp.value(), 0.25);
        ramp.advance(1.5);
        assert_eq!(ramp.value(), 1.0);
        ramp.advance(10.0);
        assert_eq!(ramp.value(), 1.0);
        assert_eq!(ramp.elapsed(), 2.0);
    }

    #[test]
    fn test_ramp_does_not_drift_with_inexact_steps() {
        let mut ramp = AttractionRamp::new(0.5, 1.0);
        for _ in 0..10 {
            ramp.advance(0.1);
        }
        assert_eq!(ramp.value(), 0.5);

        let mut ramp = AttractionRamp::new(0.5, 1.0);
        for _ in 0..60 {
            ramp.advance(1.0 / 60.0);
        }
        assert_eq!(ramp.value(), 0.5);
        for _ in 0..60 {
            ramp.advance(1.0 / 60.0);
        }
        assert_eq!(ramp.value(), 1.0);
    }

    #[test]
    fn test_ramp_ignores_negative_dt() {
        let mut ramp = AttractionRamp::new(0.5, 1.0);
        ramp.advance(-1.0);
        assert_eq!(ramp.value(), 0.0);
    }

    #[test]
    fn test_switch_resets_attraction_and_marks_dirty() {
        let sampler = ShapeSampler::new(3, 0.5);
        let mut morph = MorphState::new(sampler, ShapeKind::Sphere, 16, AttractionRamp::new(0.5, 1.0));
        assert!(morph.take_dirty());
        assert!(!morph.take_dirty());

        morph.advance(1.0);
        assert_eq!(morph.attraction(), 0.5);

        morph.switch_to(ShapeKind::Cube);
        assert_eq!(morph.shape(), ShapeKind::Cube);
        assert_eq!(morph.attraction(), 0.0);
        assert!(morph.take_dirty());
        assert_eq!(morph.texture().count(), 16);
    }
}
