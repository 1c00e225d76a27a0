//! GPU side of the optional reflection source.

use log::debug;

use crate::environment::EnvironmentImage;
use crate::error::PipelineError;

use super::context::validation_scope;

/// Environment texture plus its sampler.
///
/// Without an image a 1x1 placeholder is bound and `present` is false, so
/// the shading pass falls back to the procedural studio alone.
pub struct EnvironmentTexture {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    present: bool,
}

impl EnvironmentTexture {
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let mut env = Self::upload(device, queue, &EnvironmentImage::solid(0, 0, 0, 255));
        env.present = false;
        env
    }

    /// Upload `image` as a new texture.
    ///
    /// Creation and upload run inside a validation scope, so an image the
    /// device cannot hold (e.g. wider than `max_texture_dimension_2d`) comes
    /// back as an error.
    pub async fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &EnvironmentImage,
    ) -> Result<Self, PipelineError> {
        let (texture, error) = validation_scope(device, || Self::upload(device, queue, image)).await;
        match error {
            Some(e) => Err(PipelineError::IncompleteTarget {
                label: "environment texture",
                message: e.to_string(),
            }),
            None => Ok(texture),
        }
    }

    /// Whether a real image is bound.
    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Overwrite the pixels in place when the size matches.
    ///
    /// Returns `false` when the dimensions differ; the caller must then build a
    /// new texture and rebind it.
    pub fn write(&mut self, queue: &wgpu::Queue, image: &EnvironmentImage) -> bool {
        if image.width != self.texture.width() || image.height != self.texture.height() {
            return false;
        }
        write_pixels(queue, &self.texture, image);
        self.present = true;
        true
    }

    fn upload(device: &wgpu::Device, queue: &wgpu::Queue, image: &EnvironmentImage) -> Self {
        debug!("Uploading {}x{} environment texture", image.width, image.height);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Environment Texture"),
            size: wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_pixels(queue, &texture, image);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            present: true,
        }
    }
}

fn write_pixels(queue: &wgpu::Queue, texture: &wgpu::Texture, image: &EnvironmentImage) {
    queue.write_texture(
        texture.as_image_copy(),
        &image.data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(image.bytes_per_row()),
            rows_per_image: Some(image.height),
        },
        texture.size(),
    );
}
