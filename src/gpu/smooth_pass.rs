//! Stage B: separable bilateral smoothing of the depth field.

use crate::config::RenderParams;
use crate::error::PipelineError;
use crate::shaders::{bilateral_shader, BlurUniforms};

use super::context::{compile, field_entry, fullscreen_primitive, uniform_entry};
use super::targets::{RenderTarget, RenderTargets, DEPTH_FIELD_FORMAT};

fn blur_uniforms(params: &RenderParams, direction: [f32; 2]) -> BlurUniforms {
    BlurUniforms {
        direction,
        radius: params.blur_radius as f32,
        sigma: params.blur_sigma,
        depth_falloff: params.depth_falloff,
        _pad: [0.0; 3],
    }
}

/// Horizontal then vertical bilateral passes.
///
/// Horizontal reads `depth_field` into `blur_scratch`; vertical reads
/// `blur_scratch` into `smoothed`. Bind groups reference the targets and are
/// rebuilt by [`SmoothPass::resize`].
pub struct SmoothPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    horizontal_uniforms: wgpu::Buffer,
    vertical_uniforms: wgpu::Buffer,
    horizontal: wgpu::BindGroup,
    vertical: wgpu::BindGroup,
}

impl SmoothPass {
    pub async fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        params: &RenderParams,
        targets: &RenderTargets,
    ) -> Result<Self, PipelineError> {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Smooth Pass Bind Group Layout"),
            entries: &[
                field_entry(0, wgpu::ShaderStages::FRAGMENT),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let uniform_buffer = |label: &'static str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<BlurUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let horizontal_uniforms = uniform_buffer("Horizontal Blur Uniforms");
        let vertical_uniforms = uniform_buffer("Vertical Blur Uniforms");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Smooth Pass Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = compile(device, "bilateral pass", bilateral_shader(), |module| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Smooth Pass Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_fullscreen"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: DEPTH_FIELD_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: fullscreen_primitive(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
        .await?;

        let (horizontal, vertical) = Self::bind_groups(device, &layout, &horizontal_uniforms, &vertical_uniforms, targets);
        let pass = Self {
            pipeline,
            layout,
            horizontal_uniforms,
            vertical_uniforms,
            horizontal,
            vertical,
        };
        pass.set_params(queue, params);
        Ok(pass)
    }

    /// Upload new kernel parameters.
    pub fn set_params(&self, queue: &wgpu::Queue, params: &RenderParams) {
        queue.write_buffer(
            &self.horizontal_uniforms,
            0,
            bytemuck::bytes_of(&blur_uniforms(params, [1.0, 0.0])),
        );
        queue.write_buffer(
            &self.vertical_uniforms,
            0,
            bytemuck::bytes_of(&blur_uniforms(params, [0.0, 1.0])),
        );
    }

    /// Rebind to freshly allocated targets.
    pub fn resize(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        let (horizontal, vertical) = Self::bind_groups(
            device,
            &self.layout,
            &self.horizontal_uniforms,
            &self.vertical_uniforms,
            targets,
        );
        self.horizontal = horizontal;
        self.vertical = vertical;
    }

    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, targets: &RenderTargets) {
        self.run(encoder, "Horizontal Smooth Pass", &self.horizontal, &targets.blur_scratch);
        self.run(encoder, "Vertical Smooth Pass", &self.vertical, &targets.smoothed);
    }

    fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &'static str,
        bind_group: &wgpu::BindGroup,
        output: &RenderTarget,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &output.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn bind_groups(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        horizontal_uniforms: &wgpu::Buffer,
        vertical_uniforms: &wgpu::Buffer,
        targets: &RenderTargets,
    ) -> (wgpu::BindGroup, wgpu::BindGroup) {
        let bind = |label: &'static str, source: &RenderTarget, uniforms: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&source.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: uniforms.as_entire_binding(),
                    },
                ],
            })
        };
        (
            bind("Horizontal Smooth Bind Group", &targets.depth_field, horizontal_uniforms),
            bind("Vertical Smooth Bind Group", &targets.blur_scratch, vertical_uniforms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blur_uniforms_carry_direction() {
        let params = RenderParams::default();
        let u = blur_uniforms(&params, [0.0, 1.0]);
        assert_eq!(u.direction, [0.0, 1.0]);
        assert_eq!(u.radius, params.blur_radius as f32);
        assert_eq!(u.depth_falloff, params.depth_falloff);
    }
}
