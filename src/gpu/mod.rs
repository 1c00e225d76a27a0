//! GPU resources: device, particle buffers, simulator and fluid renderer.

mod camera;
mod context;
mod depth_pass;
mod environment;
mod normal_pass;
mod particles;
mod pipeline;
mod shade_pass;
mod simulate;
mod smooth_pass;
mod targets;

use std::sync::Arc;

use log::info;
use winit::window::Window;

pub use camera::{Camera, CameraUniforms, Projection};
pub use context::{default_instance, GpuContext};
pub use environment::EnvironmentTexture;
pub use particles::ParticleBuffers;
pub use pipeline::FluidPipeline;
pub use simulate::ParticleSimulator;
pub use targets::{RenderTarget, RenderTargets, DEPTH_FIELD_FORMAT, DEPTH_FORMAT, NORMAL_FORMAT};

use crate::config::FluidConfig;
use crate::environment::EnvironmentImage;
use crate::error::{GpuError, PipelineError, SimulationError};
use crate::shape::ShapeKind;
use crate::simulator::StepInputs;

/// Everything needed to simulate and draw into one window.
///
/// Dropping a `GpuState` releases the surface, both particle buffers, every
/// render target and every program together.
pub struct GpuState {
    surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    simulator: ParticleSimulator,
    pipeline: FluidPipeline,
    context: GpuContext,
    pub camera: Camera,
    clear_color: wgpu::Color,
}

impl GpuState {
    pub async fn new(
        window: Arc<Window>,
        fluid: &FluidConfig,
        environment: Option<&EnvironmentImage>,
    ) -> Result<Self, SimulationError> {
        let size = window.inner_size();

        let instance = default_instance();
        let surface = instance.create_surface(window).map_err(GpuError::from)?;
        let context = GpuContext::new(instance, Some(&surface)).await?;

        let surface_caps = surface.get_capabilities(&context.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::SurfaceUnsupported)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &config);

        let simulator = ParticleSimulator::new(&context.device, &context.queue, fluid).await?;
        let pipeline = FluidPipeline::new(
            &context.device,
            &context.queue,
            surface_format,
            config.width,
            config.height,
            &fluid.render,
            environment,
        )
        .await?;
        info!(
            "Fluid pipeline ready: {} particles, {}x{} {:?}",
            fluid.particle_count, config.width, config.height, surface_format
        );

        let c = fluid.render.clear_color;
        Ok(Self {
            surface,
            config,
            simulator,
            pipeline,
            context,
            camera: Camera::new(),
            clear_color: wgpu::Color {
                r: c.x as f64,
                g: c.y as f64,
                b: c.z as f64,
                a: c.w as f64,
            },
        })
    }

    /// Reconfigure the surface and reallocate every render target.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), PipelineError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.context.device, &self.config);
        self.pipeline.resize(&self.context.device, width, height)
    }

    /// Configure the surface again after it was lost or outdated.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.context.device, &self.config);
    }

    pub fn set_shape(&mut self, shape: ShapeKind) {
        self.simulator.set_shape(shape);
    }

    pub fn set_environment(&mut self, image: &EnvironmentImage) -> Result<(), PipelineError> {
        self.pipeline
            .set_environment(&self.context.device, &self.context.queue, image)
    }

    /// One simulation step followed by the four render stages.
    pub fn frame(&mut self, dt: f32, inputs: &StepInputs) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.simulator
            .step(&mut encoder, &self.context.queue, dt, inputs);
        self.pipeline.update_camera(&self.context.queue, &self.camera);

        // Background the fluid composites onto
        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        self.pipeline
            .render(&mut encoder, self.simulator.particles(), &view);

        self.context.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    pub fn simulator(&self) -> &ParticleSimulator {
        &self.simulator
    }

    pub fn pipeline(&self) -> &FluidPipeline {
        &self.pipeline
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }
}
