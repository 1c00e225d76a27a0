//! Stage D: metallic shading composited onto the output.

use glam::Vec3;

use crate::config::RenderParams;
use crate::error::PipelineError;
use crate::shaders::{shade_shader, ShadingUniforms};

use super::context::{compile, field_entry, fullscreen_primitive, uniform_entry};
use super::environment::EnvironmentTexture;
use super::targets::RenderTargets;

/// Key light from the upper front right, fill from the left.
const KEY_LIGHT: Vec3 = Vec3::new(0.4, 0.8, 0.45);
const FILL_LIGHT: Vec3 = Vec3::new(-0.7, 0.3, 0.2);
const FILL_INTENSITY: f32 = 0.35;

fn shading_uniforms(params: &RenderParams, has_environment: bool) -> ShadingUniforms {
    let key = KEY_LIGHT.normalize();
    let fill = FILL_LIGHT.normalize();
    ShadingUniforms {
        base_color: [params.base_color.x, params.base_color.y, params.base_color.z, params.fresnel_f0],
        key_light: [key.x, key.y, key.z, params.shininess],
        fill_light: [fill.x, fill.y, fill.z, FILL_INTENSITY],
        environment_mix: params.environment_mix,
        specular_strength: params.specular_strength,
        has_environment: if has_environment { 1.0 } else { 0.0 },
        _pad: 0.0,
    }
}

pub struct ShadePass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
}

impl ShadePass {
    pub async fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        camera_buffer: &wgpu::Buffer,
        targets: &RenderTargets,
        environment: &EnvironmentTexture,
    ) -> Result<Self, PipelineError> {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shade Pass Bind Group Layout"),
            entries: &[
                field_entry(0, wgpu::ShaderStages::FRAGMENT),
                field_entry(1, wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                uniform_entry(4, wgpu::ShaderStages::FRAGMENT),
                uniform_entry(5, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shading Uniform Buffer"),
            size: std::mem::size_of::<ShadingUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shade Pass Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = compile(device, "shading pass", shade_shader(), |module| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Shade Pass Pipeline"),
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
                        format: output_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
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

        let bind_group = Self::bind_group(device, &layout, &uniform_buffer, camera_buffer, targets, environment);
        Ok(Self {
            pipeline,
            layout,
            bind_group,
            uniform_buffer,
        })
    }

    pub fn set_params(&self, queue: &wgpu::Queue, params: &RenderParams, has_environment: bool) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&shading_uniforms(params, has_environment)),
        );
    }

    /// Rebind after the targets or the environment texture were replaced.
    pub fn rebind(
        &mut self,
        device: &wgpu::Device,
        camera_buffer: &wgpu::Buffer,
        targets: &RenderTargets,
        environment: &EnvironmentTexture,
    ) {
        self.bind_group = Self::bind_group(
            device,
            &self.layout,
            &self.uniform_buffer,
            camera_buffer,
            targets,
            environment,
        );
    }

    /// Blend the shaded surface over whatever `output` already holds.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shade Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        camera_buffer: &wgpu::Buffer,
        targets: &RenderTargets,
        environment: &EnvironmentTexture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shade Pass Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.normals.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.smoothed.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&environment.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&environment.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shading_uniforms_pack_f0_and_shininess() {
        let params = RenderParams::default();
        let u = shading_uniforms(&params, false);
        assert_eq!(u.base_color[3], params.fresnel_f0);
        assert_eq!(u.key_light[3], params.shininess);
        assert_eq!(u.has_environment, 0.0);
        let key = Vec3::new(u.key_light[0], u.key_light[1], u.key_light[2]);
        assert!((key.length() - 1.0).abs() < 1e-5);
        assert_eq!(shading_uniforms(&params, true).has_environment, 1.0);
    }
}
