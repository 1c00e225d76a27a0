//! # Quicksilver
//!
//! A GPU particle simulation rendered as a continuous liquid-metal surface.
//!
//! Particles live in two GPU buffers that swap roles every step. Each frame
//! they are pulled by gravity, by a morph target shape and by up to five
//! touch magnets, then drawn with screen-space fluid rendering: splat depth,
//! smooth it with a bilateral filter, rebuild normals and shade with a
//! Fresnel-weighted metallic reflection.
//!
//! ## Quick Start
//!
//! ```ignore
//! use quicksilver::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     FluidSimulation::new()
//!         .with_particle_count(16_384)
//!         .with_shape(ShapeKind::Heart)
//!         .run()
//! }
//! ```
//!
//! ## Without a window
//!
//! [`CpuSimulator`] runs the same step on the CPU and is what the property
//! tests exercise. [`gpu::ParticleSimulator`] and [`gpu::FluidPipeline`] can
//! be driven from a headless [`gpu::GpuContext`]:
//!
//! ```ignore
//! let ctx = pollster::block_on(GpuContext::headless())?;
//! let mut sim = pollster::block_on(ParticleSimulator::new(&ctx.device, &ctx.queue, &config))?;
//! let mut encoder = ctx.device.create_command_encoder(&Default::default());
//! sim.step(&mut encoder, &ctx.queue, 1.0 / 60.0, &StepInputs::default());
//! ctx.queue.submit([encoder.finish()]);
//! ```
//!
//! ## Controls (demo binary)
//!
//! | Input | Effect |
//! |-------|--------|
//! | Left drag / touch | Touch magnets (up to five) |
//! | Arrow keys | Tilt gravity |
//! | `G` | Toggle gravity |
//! | `1`-`4` | Sphere, cube, torus, heart |
//! | Right drag, scroll | Orbit and zoom |
//! | Space | Pause |

pub mod config;
pub mod environment;
pub mod error;
pub mod gpu;
pub mod input;
pub mod morph;
pub mod particle;
pub mod ping_pong;
pub mod shaders;
pub mod shape;
mod simulation;
pub mod simulator;
pub mod time;
pub mod touch;

pub use bytemuck;
pub use config::{FluidConfig, RenderParams, SimParams};
pub use environment::EnvironmentImage;
pub use error::{ConfigError, GpuError, PipelineError, SimulationError, TextureError};
pub use glam::{Vec2, Vec3, Vec4};
pub use particle::Particle;
pub use ping_pong::{PingPong, Slot};
pub use shape::{ShapeKind, ShapeSampler, ShapeTexture};
pub use simulation::FluidSimulation;
pub use simulator::{CpuSimulator, StepInputs};
pub use touch::{TouchPoint, TouchSlots, MAX_TOUCHES};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use quicksilver::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{FluidConfig, RenderParams, SimParams};
    pub use crate::environment::EnvironmentImage;
    pub use crate::error::SimulationError;
    pub use crate::gpu::{Camera, FluidPipeline, GpuContext, ParticleSimulator};
    pub use crate::shape::ShapeKind;
    pub use crate::simulation::FluidSimulation;
    pub use crate::simulator::{CpuSimulator, StepInputs};
    pub use crate::time::Time;
    pub use crate::touch::TouchPoint;
    pub use crate::{Vec2, Vec3, Vec4};
}
