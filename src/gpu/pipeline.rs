//! The four-stage fluid surface renderer.

use log::debug;

use crate::config::RenderParams;
use crate::environment::EnvironmentImage;
use crate::error::PipelineError;

use super::camera::{Camera, CameraUniforms, Projection};
use super::depth_pass::DepthPass;
use super::environment::EnvironmentTexture;
use super::normal_pass::NormalPass;
use super::particles::ParticleBuffers;
use super::shade_pass::ShadePass;
use super::smooth_pass::SmoothPass;
use super::targets::RenderTargets;

/// Depth splat → bilateral smoothing → normal reconstruction → shading.
///
/// Owns every program and intermediate field it uses. A `FluidPipeline`
/// only exists once all four programs compiled and all targets allocated.
pub struct FluidPipeline {
    camera_buffer: wgpu::Buffer,
    targets: RenderTargets,
    environment: EnvironmentTexture,
    depth: DepthPass,
    smooth: SmoothPass,
    normal: NormalPass,
    shade: ShadePass,
    params: RenderParams,
    projection: Projection,
}

impl FluidPipeline {
    /// Build every program and allocate targets at `width x height`.
    ///
    /// `output_format` is the format of the view later passed to
    /// [`FluidPipeline::render`].
    pub async fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        output_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        params: &RenderParams,
        environment: Option<&EnvironmentImage>,
    ) -> Result<Self, PipelineError> {
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Uniform Buffer"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let targets = RenderTargets::new(device, width, height).await?;
        let environment = match environment {
            Some(image) => EnvironmentTexture::from_image(device, queue, image).await?,
            None => EnvironmentTexture::placeholder(device, queue),
        };

        let depth = DepthPass::new(device, &camera_buffer).await?;
        let smooth = SmoothPass::new(device, queue, params, &targets).await?;
        let normal = NormalPass::new(device, &camera_buffer, &targets).await?;
        let shade = ShadePass::new(device, output_format, &camera_buffer, &targets, &environment).await?;
        shade.set_params(queue, params, environment.is_present());

        let (w, h) = targets.size();
        let pipeline = Self {
            camera_buffer,
            targets,
            environment,
            depth,
            smooth,
            normal,
            shade,
            params: params.clone(),
            projection: Projection::new(params, w, h),
        };
        pipeline.update_camera(queue, &Camera::new());
        Ok(pipeline)
    }

    /// Reallocate every intermediate field at the new size.
    ///
    /// Blocks until the allocation has been validated. On error the previous
    /// targets stay bound.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<(), PipelineError> {
        let (width, height) = (width.max(1), height.max(1));
        if self.targets.size() == (width, height) {
            return Ok(());
        }
        debug!("Resizing fluid pipeline to {}x{}", width, height);

        self.targets = pollster::block_on(RenderTargets::new(device, width, height))?;
        self.smooth.resize(device, &self.targets);
        self.normal.resize(device, &self.camera_buffer, &self.targets);
        self.shade.rebind(device, &self.camera_buffer, &self.targets, &self.environment);
        self.projection.resize(width, height);
        Ok(())
    }

    /// Upload view and projection for the next frame.
    pub fn update_camera(&self, queue: &wgpu::Queue, camera: &Camera) {
        let uniforms = CameraUniforms::new(camera, &self.projection, self.params.particle_radius);
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Replace the reflection source, e.g. with the latest camera frame.
    ///
    /// Same-sized images overwrite the bound texture in place. Otherwise a new
    /// texture is created, blocking until it has been validated; on error the
    /// previous environment stays bound.
    pub fn set_environment(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &EnvironmentImage,
    ) -> Result<(), PipelineError> {
        if !self.environment.write(queue, image) {
            self.environment = pollster::block_on(EnvironmentTexture::from_image(device, queue, image))?;
            self.shade.rebind(device, &self.camera_buffer, &self.targets, &self.environment);
        }
        self.shade.set_params(queue, &self.params, true);
        Ok(())
    }

    /// Go back to the procedural studio environment only.
    pub fn clear_environment(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.environment = EnvironmentTexture::placeholder(device, queue);
        self.shade.rebind(device, &self.camera_buffer, &self.targets, &self.environment);
        self.shade.set_params(queue, &self.params, false);
    }

    /// Swap in new render parameters.
    pub fn set_params(&mut self, queue: &wgpu::Queue, params: &RenderParams) {
        self.params = params.clone();
        let (width, height) = self.targets.size();
        self.projection = Projection::new(params, width, height);
        self.smooth.set_params(queue, params);
        self.shade.set_params(queue, params, self.environment.is_present());
    }

    /// Encode all four stages, compositing the surface onto `output`.
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, particles: &ParticleBuffers, output: &wgpu::TextureView) {
        self.depth.encode(encoder, &self.targets, particles);
        self.smooth.encode(encoder, &self.targets);
        self.normal.encode(encoder, &self.targets);
        self.shade.encode(encoder, output);
    }

    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }
}
