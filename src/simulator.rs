//! Particle step: uniforms shared with the GPU kernel, and the CPU reference.
//!
//! [`integrate`] is the executable definition of one particle update. The
//! WGSL kernel in [`crate::shaders::simulation_shader`] performs the same
//! operations in the same order on the same [`SimUniforms`] block.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::{FluidConfig, SimParams};
use crate::morph::{AttractionRamp, MorphState};
use crate::particle::{spawn_particles, Particle};
use crate::ping_pong::{PingPong, Slot};
use crate::shape::{ShapeKind, ShapeSampler, ShapeTexture};
use crate::touch::{TouchPoint, MAX_TOUCHES};

/// Per-step external inputs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepInputs {
    /// Gravity direction and magnitude; only the direction is used once it
    /// exceeds epsilon.
    pub gravity: Vec3,
    pub touches: [TouchPoint; MAX_TOUCHES],
}

impl StepInputs {
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            ..Default::default()
        }
    }
}

/// Uniform block consumed by the simulation kernel.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SimUniforms {
    pub gravity: [f32; 3],
    pub delta_time: f32,
    pub attraction: f32,
    pub gravity_strength: f32,
    pub spring_gain: f32,
    pub touch_gain: f32,
    pub damping: f32,
    pub bounce: f32,
    pub epsilon: f32,
    pub particle_count: u32,
    pub half_bounds: [f32; 3],
    pub target_side: u32,
    /// `xyz` world position, `w` strength; zero strength means inert.
    pub touches: [[f32; 4]; MAX_TOUCHES],
}

impl SimUniforms {
    /// WGSL declaration matching this struct.
    pub const WGSL_STRUCT: &'static str = r#"struct SimUniforms {
    gravity: vec3<f32>,
    delta_time: f32,
    attraction: f32,
    gravity_strength: f32,
    spring_gain: f32,
    touch_gain: f32,
    damping: f32,
    bounce: f32,
    epsilon: f32,
    particle_count: u32,
    half_bounds: vec3<f32>,
    target_side: u32,
    touches: array<vec4<f32>, 5>,
};"#;

    /// Assemble the block for one step.
    pub fn new(
        params: &SimParams,
        half_bounds: Vec3,
        particle_count: u32,
        target_side: u32,
        attraction: f32,
        dt: f32,
        inputs: &StepInputs,
    ) -> Self {
        let mut touches = [[0.0; 4]; MAX_TOUCHES];
        for (slot, touch) in touches.iter_mut().zip(&inputs.touches) {
            if touch.strength > 0.0 {
                let p = touch.world_position(half_bounds);
                *slot = [p.x, p.y, p.z, touch.strength];
            }
        }
        Self {
            gravity: inputs.gravity.to_array(),
            delta_time: dt,
            attraction: attraction.clamp(0.0, 1.0),
            gravity_strength: params.gravity_strength,
            spring_gain: params.spring_gain,
            touch_gain: params.touch_gain,
            damping: params.damping,
            bounce: params.bounce,
            epsilon: params.epsilon,
            particle_count,
            half_bounds: half_bounds.to_array(),
            target_side,
            touches,
        }
    }
}

/// Advance one particle by one step.
///
/// `goal` is the particle's shape target. Every length used as a divisor is
/// checked against epsilon first, so finite inputs give finite outputs.
pub fn integrate(particle: &Particle, goal: Vec3, u: &SimUniforms) -> Particle {
    let dt = u.delta_time;
    let eps = u.epsilon;
    let mut position = particle.position;
    let mut velocity = particle.velocity;

    // Gravity
    let gravity = Vec3::from_array(u.gravity);
    let gravity_len = gravity.length();
    if gravity_len > eps {
        velocity += (gravity / gravity_len) * u.gravity_strength * dt;
    }

    // Shape attraction
    if u.attraction > 0.0 {
        let to_goal = goal - position;
        let dist = to_goal.length();
        if dist > eps {
            velocity += (to_goal / dist) * u.attraction * u.spring_gain * dt;
        }
    }

    // Touch magnets
    for touch in &u.touches {
        if touch[3] <= 0.0 {
            continue;
        }
        let delta = Vec3::new(touch[0], touch[1], touch[2]) - position;
        let dist2 = delta.dot(delta);
        let dist = dist2.sqrt();
        if dist > eps {
            velocity += (delta / dist) * touch[3] * u.touch_gain / (dist2 + eps) * dt;
        }
    }

    velocity *= u.damping;
    position += velocity * dt;

    // Walls
    let half = Vec3::from_array(u.half_bounds);
    for axis in 0..3 {
        if position[axis] < -half[axis] {
            position[axis] = -half[axis];
            velocity[axis] = -velocity[axis] * u.bounce;
        } else if position[axis] > half[axis] {
            position[axis] = half[axis];
            velocity[axis] = -velocity[axis] * u.bounce;
        }
    }

    Particle {
        position,
        id: particle.id,
        velocity,
        _pad: 0,
    }
}

/// CPU particle simulator over a ping-pong pair of particle vectors.
#[derive(Debug, Clone)]
pub struct CpuSimulator {
    state: PingPong<Vec<Particle>>,
    params: SimParams,
    half_bounds: Vec3,
    morph: MorphState,
}

impl CpuSimulator {
    /// Spawn the particle pool described by `config`.
    pub fn new(config: &FluidConfig) -> Self {
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let particles = spawn_particles(config.particle_count, config.half_bounds, &mut rng);
        Self::from_particles(config, particles)
    }

    /// Start from explicit particles. Ids are reassigned to `0..N` in order.
    pub fn from_particles(config: &FluidConfig, mut particles: Vec<Particle>) -> Self {
        for (id, particle) in particles.iter_mut().enumerate() {
            particle.id = id as u32;
        }
        let count = particles.len() as u32;
        let sampler = ShapeSampler::new(config.seed, config.sim.shape_scale);
        let ramp = AttractionRamp::new(config.sim.attraction_rate, config.sim.attraction_target);
        let morph = MorphState::new(sampler, config.initial_shape, count, ramp);
        let scratch = particles.clone();
        Self {
            state: PingPong::new(particles, scratch),
            params: config.sim.clone(),
            half_bounds: config.half_bounds,
            morph,
        }
    }

    /// Switch morph target; attraction restarts from zero.
    pub fn set_shape(&mut self, shape: ShapeKind) {
        self.morph.switch_to(shape);
    }

    /// Run one step of `dt` seconds, then flip the readable buffer.
    pub fn step(&mut self, dt: f32, inputs: &StepInputs) {
        let uniforms = self.uniforms(dt, inputs);
        let targets = self.morph.texture();
        let (src, dst) = self.state.split_mut();
        for (out, particle) in dst.iter_mut().zip(src) {
            *out = integrate(particle, targets.decode(particle.id), &uniforms);
        }
        self.state.flip();
        self.morph.advance(dt);
    }

    /// The uniform block the next step would use.
    pub fn uniforms(&self, dt: f32, inputs: &StepInputs) -> SimUniforms {
        SimUniforms::new(
            &self.params,
            self.half_bounds,
            self.particle_count(),
            self.morph.texture().side(),
            self.morph.attraction(),
            dt,
            inputs,
        )
    }

    /// Current particle state.
    pub fn particles(&self) -> &[Particle] {
        self.state.readable()
    }

    pub fn particle_count(&self) -> u32 {
        self.state.readable().len() as u32
    }

    pub fn readable_slot(&self) -> Slot {
        self.state.readable_slot()
    }

    pub fn state(&self) -> &PingPong<Vec<Particle>> {
        &self.state
    }

    pub fn attraction(&self) -> f32 {
        self.morph.attraction()
    }

    pub fn shape(&self) -> ShapeKind {
        self.morph.shape()
    }

    pub fn targets(&self) -> &ShapeTexture {
        self.morph.texture()
    }

    pub fn half_bounds(&self) -> Vec3 {
        self.half_bounds
    }
}
