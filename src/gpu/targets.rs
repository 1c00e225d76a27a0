//! Screen-sized intermediate fields of the fluid pipeline.

use log::debug;

use crate::error::{GpuError, PipelineError};

use super::context::{map_staging, validation_scope};

/// View-space depth written by the splat pass; zero marks background.
pub const DEPTH_FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;
/// Normals in `xyz`, coverage in `a`.
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Hardware depth used for splat occlusion.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A texture and its default view.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(
        device: &wgpu::Device,
        label: &'static str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Copy the whole texture back to the CPU as tightly packed rows.
    pub fn read_bytes(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<u8>, GpuError> {
        let width = self.texture.width();
        let height = self.texture.height();
        let texel = self.texture.format().block_copy_size(None).unwrap_or(4);
        let unpadded = width * texel;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Field Readback Buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Field Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            self.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            self.texture.size(),
        );
        queue.submit(std::iter::once(encoder.finish()));

        let bytes = map_staging(device, &staging)?;
        let mut packed = Vec::with_capacity((unpadded * height) as usize);
        for row in bytes.chunks_exact(padded as usize) {
            packed.extend_from_slice(&row[..unpadded as usize]);
        }
        Ok(packed)
    }

    /// Read an `R32Float` target, one value per texel, row-major.
    pub fn read_f32(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<f32>, GpuError> {
        let bytes = self.read_bytes(device, queue)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Read an `Rgba16Float` target as raw half-float bit patterns.
    pub fn read_rgba16_bits(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<[u16; 4]>, GpuError> {
        let bytes = self.read_bytes(device, queue)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }
}

/// Every intermediate field, sized to the display surface.
///
/// Each field is written by exactly one stage and read by the next:
/// `depth_field` (A) → `blur_scratch` (B, horizontal) → `smoothed`
/// (B, vertical) → `normals` (C) → shading (D).
pub struct RenderTargets {
    pub depth_field: RenderTarget,
    pub blur_scratch: RenderTarget,
    pub smoothed: RenderTarget,
    pub normals: RenderTarget,
    pub depth: RenderTarget,
    width: u32,
    height: u32,
}

impl RenderTargets {
    /// Allocate all fields at `width x height`.
    ///
    /// Allocation runs inside a validation scope; any reported error means a
    /// target is unusable and is returned instead of the targets.
    pub async fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, PipelineError> {
        let width = width.max(1);
        let height = height.max(1);
        debug!("Allocating render targets at {}x{}", width, height);

        let field_usage = wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC;

        let (targets, error) = validation_scope(device, || Self {
            depth_field: RenderTarget::new(device, "Depth Field", DEPTH_FIELD_FORMAT, width, height, field_usage),
            blur_scratch: RenderTarget::new(device, "Blur Scratch Field", DEPTH_FIELD_FORMAT, width, height, field_usage),
            smoothed: RenderTarget::new(device, "Smoothed Depth Field", DEPTH_FIELD_FORMAT, width, height, field_usage),
            normals: RenderTarget::new(device, "Normal Field", NORMAL_FORMAT, width, height, field_usage),
            depth: RenderTarget::new(
                device,
                "Splat Depth Buffer",
                DEPTH_FORMAT,
                width,
                height,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
            width,
            height,
        })
        .await;

        match error {
            Some(e) => Err(PipelineError::IncompleteTarget {
                label: "render targets",
                message: e.to_string(),
            }),
            None => Ok(targets),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
