//! GPU particle simulator.
//!
//! Runs the kernel from [`crate::shaders::simulation_shader`] over the
//! readable particle buffer, writing into the other one, then flips.

use glam::Vec3;
use log::debug;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::{FluidConfig, SimParams};
use crate::error::{GpuError, PipelineError};
use crate::morph::{AttractionRamp, MorphState};
use crate::particle::{spawn_particles, Particle};
use crate::ping_pong::{PingPong, Slot};
use crate::shaders::{simulation_shader, WORKGROUP_SIZE};
use crate::shape::{ShapeKind, ShapeSampler};
use crate::simulator::{SimUniforms, StepInputs};

use super::context::{compile, uniform_entry};
use super::particles::ParticleBuffers;

pub struct ParticleSimulator {
    pipeline: wgpu::ComputePipeline,
    /// Indexed by the readable slot: reads that buffer, writes the other.
    bind_groups: PingPong<wgpu::BindGroup>,
    uniform_buffer: wgpu::Buffer,
    shape_texture: wgpu::Texture,
    particles: ParticleBuffers,
    params: SimParams,
    half_bounds: Vec3,
    morph: MorphState,
}

impl ParticleSimulator {
    /// Spawn the pool from the config seed and build the kernel.
    pub async fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &FluidConfig,
    ) -> Result<Self, PipelineError> {
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let particles = spawn_particles(config.particle_count, config.half_bounds, &mut rng);
        Self::with_particles(device, queue, config, particles).await
    }

    /// Start from explicit particles. Ids are reassigned to `0..N` in order.
    pub async fn with_particles(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &FluidConfig,
        mut particles: Vec<Particle>,
    ) -> Result<Self, PipelineError> {
        for (id, particle) in particles.iter_mut().enumerate() {
            particle.id = id as u32;
        }
        let count = particles.len() as u32;

        let sampler = ShapeSampler::new(config.seed, config.sim.shape_scale);
        let ramp = AttractionRamp::new(config.sim.attraction_rate, config.sim.attraction_target);
        let morph = MorphState::new(sampler, config.initial_shape, count, ramp);

        let particles = ParticleBuffers::new(device, &particles);

        let side = morph.texture().side();
        let shape_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shape Target Texture"),
            size: wgpu::Extent3d {
                width: side,
                height: side,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let shape_view = shape_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Simulation Uniform Buffer"),
            size: std::mem::size_of::<SimUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Simulation Bind Group Layout"),
            entries: &[
                storage(0, true),
                storage(1, false),
                uniform_entry(2, wgpu::ShaderStages::COMPUTE),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let bind_groups = PingPong::from_fn(|read| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(match read {
                    Slot::A => "Simulation Bind Group (A -> B)",
                    Slot::B => "Simulation Bind Group (B -> A)",
                }),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: particles.slot(read).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: particles.slot(read.other()).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&shape_view),
                    },
                ],
            })
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Simulation Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = compile(device, "simulation kernel", simulation_shader(), |module| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Simulation Pipeline"),
                layout: Some(&pipeline_layout),
                module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        })
        .await?;

        let mut simulator = Self {
            pipeline,
            bind_groups,
            uniform_buffer,
            shape_texture,
            particles,
            params: config.sim.clone(),
            half_bounds: config.half_bounds,
            morph,
        };
        simulator.upload_targets(queue);
        Ok(simulator)
    }

    /// Switch morph target; the new targets upload with the next step.
    pub fn set_shape(&mut self, shape: ShapeKind) {
        self.morph.switch_to(shape);
    }

    /// Encode one step of `dt` seconds and flip the readable buffer.
    ///
    /// The uniform block is written through `queue`, so submit `encoder`
    /// before encoding another step.
    pub fn step(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        dt: f32,
        inputs: &StepInputs,
    ) {
        self.upload_targets(queue);
        let uniforms = self.uniforms(dt, inputs);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let count = self.particles.count();
        if count > 0 {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Simulation Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, self.bind_groups.slot(self.particles.readable_slot()), &[]);
            pass.dispatch_workgroups(count.div_ceil(WORKGROUP_SIZE), 1, 1);
        }

        self.particles.flip();
        self.morph.advance(dt);
    }

    /// The uniform block the next step would use.
    pub fn uniforms(&self, dt: f32, inputs: &StepInputs) -> SimUniforms {
        SimUniforms::new(
            &self.params,
            self.half_bounds,
            self.particles.count(),
            self.morph.texture().side(),
            self.morph.attraction(),
            dt,
            inputs,
        )
    }

    pub fn particles(&self) -> &ParticleBuffers {
        &self.particles
    }

    /// Copy the current particle state back to the CPU. Blocks on the GPU.
    pub fn read_particles(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<Particle>, GpuError> {
        self.particles.read(device, queue)
    }

    pub fn attraction(&self) -> f32 {
        self.morph.attraction()
    }

    pub fn shape(&self) -> ShapeKind {
        self.morph.shape()
    }

    pub fn morph(&self) -> &MorphState {
        &self.morph
    }

    fn upload_targets(&mut self, queue: &wgpu::Queue) {
        if !self.morph.take_dirty() {
            return;
        }
        let targets = self.morph.texture();
        debug!("Uploading {} shape targets ({}x{})", targets.count(), targets.side(), targets.side());
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.shape_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            targets.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(targets.bytes_per_row()),
                rows_per_image: Some(targets.side()),
            },
            wgpu::Extent3d {
                width: targets.side(),
                height: targets.side(),
                depth_or_array_layers: 1,
            },
        );
    }
}
