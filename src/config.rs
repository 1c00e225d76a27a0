//! Simulation and rendering parameters.
//!
//! Everything tunable lives here. [`FluidConfig`] follows the builder style
//! used across the crate: start from `default()` and chain `with_*` calls.

use glam::{Vec3, Vec4};

use crate::error::ConfigError;
use crate::shape::ShapeKind;

/// Largest bilateral half-width the smoothing shader accepts.
pub const MAX_BLUR_RADIUS: u32 = 32;

/// Physical constants for the particle step.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    /// Gravity acceleration `g` applied along the normalized gravity input.
    pub gravity_strength: f32,
    /// Shape-attraction gain `K`.
    pub spring_gain: f32,
    /// Touch-magnet gain `C`.
    pub touch_gain: f32,
    /// Per-step velocity multiplier (< 1).
    pub damping: f32,
    /// Fraction of normal velocity kept after a wall hit.
    pub bounce: f32,
    /// Floor for lengths and divisors.
    pub epsilon: f32,
    /// Attraction ramp speed per second after a shape switch.
    pub attraction_rate: f32,
    /// Value the attraction ramp settles at.
    pub attraction_target: f32,
    /// Exponential decay rate of released touch strengths.
    pub touch_decay: f32,
    /// Strength below which a released touch becomes inert.
    pub touch_epsilon: f32,
    /// World-space size of the morph shapes.
    pub shape_scale: f32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            gravity_strength: 9.81,
            spring_gain: 6.0,
            touch_gain: 0.6,
            damping: 0.98,
            bounce: 0.5,
            epsilon: 1e-4,
            attraction_rate: 0.5,
            attraction_target: 1.0,
            touch_decay: 6.0,
            touch_epsilon: 1e-3,
            shape_scale: 0.6,
        }
    }
}

/// Parameters for the four screen-space passes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    /// World-space radius of each splat.
    pub particle_radius: f32,
    /// Taps on each side of the bilateral kernel.
    pub blur_radius: u32,
    /// Spatial Gaussian sigma, in pixels.
    pub blur_sigma: f32,
    /// Range weight falloff: `exp(-delta_depth^2 * falloff)`.
    pub depth_falloff: f32,
    /// Metallic tint multiplied into reflections.
    pub base_color: Vec3,
    /// Schlick reflectance at normal incidence.
    pub fresnel_f0: f32,
    /// Blend between the studio environment (0) and the environment texture (1).
    pub environment_mix: f32,
    pub specular_strength: f32,
    pub shininess: f32,
    /// Colour the display surface is cleared to before compositing.
    pub clear_color: Vec4,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            particle_radius: 0.035,
            blur_radius: 10,
            blur_sigma: 5.0,
            depth_falloff: 400.0,
            base_color: Vec3::new(0.92, 0.93, 0.96),
            fresnel_f0: 0.75,
            environment_mix: 0.6,
            specular_strength: 1.4,
            shininess: 96.0,
            clear_color: Vec4::new(0.02, 0.02, 0.03, 1.0),
            fov_y_degrees: 45.0,
            near: 0.05,
            far: 50.0,
        }
    }
}

/// Complete configuration for a fluid simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidConfig {
    /// Fixed particle pool size `N`.
    pub particle_count: u32,
    /// Box extent on each axis; positions stay in `[-h, h]`.
    pub half_bounds: Vec3,
    /// Seed for spawn positions and random shapes.
    pub seed: u64,
    pub initial_shape: ShapeKind,
    /// Upper bound applied to frame delta time before stepping.
    pub max_delta: f32,
    pub sim: SimParams,
    pub render: RenderParams,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            particle_count: 16_384,
            half_bounds: Vec3::ONE,
            seed: 0x5eed,
            initial_shape: ShapeKind::Sphere,
            max_delta: 0.033,
            sim: SimParams::default(),
            render: RenderParams::default(),
        }
    }
}

impl FluidConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of particles.
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particle_count = count;
        self
    }

    /// Set the box half-extent per axis.
    pub fn with_bounds(mut self, half_bounds: Vec3) -> Self {
        self.half_bounds = half_bounds;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the shape particles morph into at startup.
    pub fn with_shape(mut self, shape: ShapeKind) -> Self {
        self.initial_shape = shape;
        self
    }

    /// Set the delta-time clamp.
    pub fn with_max_delta(mut self, max_delta: f32) -> Self {
        self.max_delta = max_delta;
        self
    }

    pub fn with_sim_params(mut self, sim: SimParams) -> Self {
        self.sim = sim;
        self
    }

    pub fn with_render_params(mut self, render: RenderParams) -> Self {
        self.render = render;
        self
    }

    /// Reject values the simulation or renderer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.half_bounds.min_element() > 0.0) || !self.half_bounds.is_finite() {
            return Err(ConfigError::new("half_bounds", "every axis must be positive and finite"));
        }
        if !(self.max_delta > 0.0) {
            return Err(ConfigError::new("max_delta", "must be positive"));
        }

        let sim = &self.sim;
        if !(sim.damping > 0.0 && sim.damping <= 1.0) {
            return Err(ConfigError::new("damping", format!("{} is outside (0, 1]", sim.damping)));
        }
        if !(0.0..=1.0).contains(&sim.bounce) {
            return Err(ConfigError::new("bounce", format!("{} is outside [0, 1]", sim.bounce)));
        }
        if !(sim.epsilon > 0.0) {
            return Err(ConfigError::new("epsilon", "must be positive"));
        }
        if !(sim.attraction_target > 0.0 && sim.attraction_target <= 1.0) {
            return Err(ConfigError::new("attraction_target", "must be in (0, 1]"));
        }
        if sim.attraction_rate < 0.0 || sim.touch_decay < 0.0 {
            return Err(ConfigError::new("attraction_rate", "rates must not be negative"));
        }

        let render = &self.render;
        if !(render.particle_radius > 0.0) {
            return Err(ConfigError::new("particle_radius", "must be positive"));
        }
        if render.blur_radius > MAX_BLUR_RADIUS {
            return Err(ConfigError::new(
                "blur_radius",
                format!("{} exceeds the maximum of {}", render.blur_radius, MAX_BLUR_RADIUS),
            ));
        }
        if !(render.blur_sigma > 0.0) {
            return Err(ConfigError::new("blur_sigma", "must be positive"));
        }
        if !(render.near > 0.0 && render.far > render.near) {
            return Err(ConfigError::new("near", "need 0 < near < far"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(FluidConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = FluidConfig::new()
            .with_particle_count(4)
            .with_bounds(Vec3::splat(2.0))
            .with_shape(ShapeKind::Heart)
            .with_seed(11);
        assert_eq!(config.particle_count, 4);
        assert_eq!(config.half_bounds, Vec3::splat(2.0));
        assert_eq!(config.initial_shape, ShapeKind::Heart);
        assert_eq!(config.seed, 11);
    }

    #[test]
    fn test_rejects_bad_damping() {
        let mut config = FluidConfig::default();
        config.sim.damping = 1.5;
        assert_eq!(config.validate().unwrap_err().field, "damping");
        config.sim.damping = 0.0;
        assert_eq!(config.validate().unwrap_err().field, "damping");
    }

    #[test]
    fn test_rejects_flat_bounds() {
        let config = FluidConfig::default().with_bounds(Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(config.validate().unwrap_err().field, "half_bounds");
    }

    #[test]
    fn test_rejects_wide_blur() {
        let mut config = FluidConfig::default();
        config.render.blur_radius = MAX_BLUR_RADIUS + 1;
        assert_eq!(config.validate().unwrap_err().field, "blur_radius");
    }

    #[test]
    fn test_zero_particles_allowed() {
        let config = FluidConfig::default().with_particle_count(0);
        assert!(config.validate().is_ok());
    }
}
