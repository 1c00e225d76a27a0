//! Stage C: view-space normals from the smoothed depth field.

use crate::error::PipelineError;
use crate::shaders::normal_shader;

use super::context::{compile, field_entry, fullscreen_primitive, uniform_entry};
use super::targets::{RenderTargets, NORMAL_FORMAT};

pub struct NormalPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl NormalPass {
    pub async fn new(
        device: &wgpu::Device,
        camera_buffer: &wgpu::Buffer,
        targets: &RenderTargets,
    ) -> Result<Self, PipelineError> {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Normal Pass Bind Group Layout"),
            entries: &[
                field_entry(0, wgpu::ShaderStages::FRAGMENT),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Normal Pass Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = compile(device, "normal pass", normal_shader(), |module| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Normal Pass Pipeline"),
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
                        format: NORMAL_FORMAT,
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

        let bind_group = Self::bind_group(device, &layout, camera_buffer, targets);
        Ok(Self {
            pipeline,
            layout,
            bind_group,
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, camera_buffer: &wgpu::Buffer, targets: &RenderTargets) {
        self.bind_group = Self::bind_group(device, &self.layout, camera_buffer, targets);
    }

    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, targets: &RenderTargets) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Normal Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.normals.view,
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
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        camera_buffer: &wgpu::Buffer,
        targets: &RenderTargets,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Normal Pass Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.smoothed.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: camera_buffer.as_entire_binding(),
                },
            ],
        })
    }
}
