//! GPU simulator and fluid pipeline on a headless device.
//!
//! Every test skips when no adapter is available.

use glam::Vec3;
use quicksilver::gpu::{Camera, FluidPipeline, GpuContext, ParticleBuffers, ParticleSimulator, RenderTargets};
use quicksilver::{
    CpuSimulator, EnvironmentImage, FluidConfig, Particle, PipelineError, ShapeKind, Slot, StepInputs, TouchPoint,
};

const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

async fn test_context() -> Option<GpuContext> {
    match GpuContext::headless().await {
        Ok(ctx) => Some(ctx),
        Err(_) => {
            println!("SKIP: No GPU adapter available");
            None
        }
    }
}

fn step_gpu(ctx: &GpuContext, sim: &mut ParticleSimulator, dt: f32, inputs: &StepInputs) {
    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Test Step Encoder"),
    });
    sim.step(&mut encoder, &ctx.queue, dt, inputs);
    ctx.queue.submit([encoder.finish()]);
}

fn output_texture(ctx: &GpuContext, width: u32, height: u32) -> wgpu::TextureView {
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Output"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OUTPUT_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Half-float 1.0.
const HALF_ONE: u16 = 0x3C00;
const HALF_SIGN: u16 = 0x8000;

fn render_once(ctx: &GpuContext, pipeline: &FluidPipeline, particles: &ParticleBuffers) {
    let (width, height) = pipeline.targets().size();
    let output = output_texture(ctx, width, height);
    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Test Render Encoder"),
    });
    pipeline.render(&mut encoder, particles, &output);
    ctx.queue.submit([encoder.finish()]);
}

/// A 64x64 pipeline looking at one particle at the orbit target.
async fn single_splat(ctx: &GpuContext, radius: f32) -> (FluidPipeline, ParticleBuffers) {
    let mut config = FluidConfig::default();
    config.render.particle_radius = radius;
    let pipeline = FluidPipeline::new(&ctx.device, &ctx.queue, OUTPUT_FORMAT, 64, 64, &config.render, None)
        .await
        .expect("fluid pipeline should build");
    pipeline.update_camera(&ctx.queue, &Camera::new());
    let particles = ParticleBuffers::new(&ctx.device, &[Particle::new(0, Vec3::ZERO, Vec3::ZERO)]);
    (pipeline, particles)
}

/// Wide box so no particle reaches a wall in the few steps compared;
/// a wall contact on one side only would flip a velocity.
fn comparison_config() -> FluidConfig {
    FluidConfig::default()
        .with_particle_count(1000)
        .with_bounds(Vec3::splat(10.0))
        .with_seed(1234)
}

#[test]
fn test_gpu_step_matches_cpu_reference() {
    pollster::block_on(async {
        let Some(ctx) = test_context().await else {
            return;
        };
        let config = comparison_config();
        let mut cpu = CpuSimulator::new(&config);
        let mut gpu = ParticleSimulator::with_particles(&ctx.device, &ctx.queue, &config, cpu.particles().to_vec())
            .await
            .expect("simulation kernel should build");

        let mut touches = [TouchPoint::default(); 5];
        touches[0] = TouchPoint {
            // Far corner of the box, well away from the cloud
            x: 0.9,
            y: 0.9,
            strength: 1.0,
            active: true,
        };
        let inputs = StepInputs {
            gravity: Vec3::new(0.3, -1.0, 0.0),
            touches,
        };

        for step in 0..12 {
            if step == 4 {
                cpu.set_shape(ShapeKind::Heart);
                gpu.set_shape(ShapeKind::Heart);
            }
            cpu.step(1.0 / 60.0, &inputs);
            step_gpu(&ctx, &mut gpu, 1.0 / 60.0, &inputs);
        }
        assert_eq!(cpu.attraction(), gpu.attraction());

        let from_gpu = gpu.read_particles(&ctx.device, &ctx.queue).expect("readback");
        assert_eq!(from_gpu.len(), cpu.particles().len());
        for (g, c) in from_gpu.iter().zip(cpu.particles()) {
            assert_eq!(g.id, c.id);
            assert!(
                g.position.abs_diff_eq(c.position, 1e-3),
                "particle {}: gpu {:?} cpu {:?}",
                c.id,
                g.position,
                c.position
            );
            assert!(g.velocity.abs_diff_eq(c.velocity, 1e-2));
        }
    });
}

#[test]
fn test_gpu_buffers_alternate() {
    pollster::block_on(async {
        let Some(ctx) = test_context().await else {
            return;
        };
        let config = FluidConfig::default().with_particle_count(300);
        let mut sim = ParticleSimulator::new(&ctx.device, &ctx.queue, &config)
            .await
            .expect("simulation kernel should build");

        assert_eq!(sim.particles().readable_slot(), Slot::A);
        let initial = sim.read_particles(&ctx.device, &ctx.queue).expect("readback");

        step_gpu(&ctx, &mut sim, 0.016, &StepInputs::with_gravity(Vec3::NEG_Y));
        assert_eq!(sim.particles().readable_slot(), Slot::B);

        let stepped = sim.read_particles(&ctx.device, &ctx.queue).expect("readback");
        assert_eq!(stepped.len(), initial.len());
        assert!(stepped.iter().zip(&initial).all(|(a, b)| a.id == b.id));
        assert!(stepped.iter().zip(&initial).any(|(a, b)| a.position != b.position));

        step_gpu(&ctx, &mut sim, 0.016, &StepInputs::with_gravity(Vec3::NEG_Y));
        assert_eq!(sim.particles().readable_slot(), Slot::A);
    });
}

#[test]
fn test_empty_pool_steps_without_dispatch() {
    pollster::block_on(async {
        let Some(ctx) = test_context().await else {
            return;
        };
        let config = FluidConfig::default().with_particle_count(0);
        let mut sim = ParticleSimulator::new(&ctx.device, &ctx.queue, &config)
            .await
            .expect("simulation kernel should build");
        step_gpu(&ctx, &mut sim, 0.016, &StepInputs::default());

        assert_eq!(sim.particles().count(), 0);
        assert!(sim.read_particles(&ctx.device, &ctx.queue).expect("readback").is_empty());
    });
}

#[test]
fn test_depth_field_is_background_without_particles() {
    pollster::block_on(async {
        let Some(ctx) = test_context().await else {
            return;
        };
        let config = FluidConfig::default();
        let pipeline = FluidPipeline::new(&ctx.device, &ctx.queue, OUTPUT_FORMAT, 64, 64, &config.render, None)
            .await
            .expect("fluid pipeline should build");
        pipeline.update_camera(&ctx.queue, &Camera::new());

        let particles = ParticleBuffers::new(&ctx.device, &[]);
        let output = output_texture(&ctx, 64, 64);
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Test Render Encoder"),
        });
        pipeline.render(&mut encoder, &particles, &output);
        ctx.queue.submit([encoder.finish()]);

        let field = pipeline.targets().depth_field.read_f32(&ctx.device, &ctx.queue).expect("readback");
        assert_eq!(field.len(), 64 * 64);
        assert!(field.iter().all(|&d| d == 0.0));
    });
}

#[test]
fn test_particle_at_target_is_splatted() {
    pollster::block_on(async {
        let Some(ctx) = test_context().await else {
            return;
        };
        let mut config = FluidConfig::default();
        config.render.particle_radius = 0.2;
        let mut pipeline = FluidPipeline::new(&ctx.device, &ctx.queue, OUTPUT_FORMAT, 32, 32, &config.render, None)
            .await
            .expect("fluid pipeline should build");
        pipeline.resize(&ctx.device, 64, 64).expect("resize");
        assert_eq!(pipeline.targets().size(), (64, 64));
        pipeline.update_camera(&ctx.queue, &Camera::new());

        let particles = ParticleBuffers::new(&ctx.device, &[Particle::new(0, Vec3::ZERO, Vec3::ZERO)]);
        let output = output_texture(&ctx, 64, 64);
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Test Render Encoder"),
        });
        pipeline.render(&mut encoder, &particles, &output);
        ctx.queue.submit([encoder.finish()]);

        let field = pipeline.targets().depth_field.read_f32(&ctx.device, &ctx.queue).expect("readback");
        let centre = field[32 * 64 + 32];
        // View space looks down -Z
        assert!(centre < 0.0, "centre depth {}", centre);
        assert_eq!(field[0], 0.0);
    });
}

#[test]
fn test_bilateral_filter_keeps_background_empty() {
    pollster::block_on(async {
        let Some(ctx) = test_context().await else {
            return;
        };
        let (pipeline, particles) = single_splat(&ctx, 0.2).await;
        render_once(&ctx, &pipeline, &particles);

        let targets = pipeline.targets();
        let field = targets.depth_field.read_f32(&ctx.device, &ctx.queue).expect("readback");
        let smoothed = targets.smoothed.read_f32(&ctx.device, &ctx.queue).expect("readback");
        assert_eq!(smoothed.len(), field.len());
        assert!(field.iter().any(|&d| d == 0.0));
        assert!(field.iter().any(|&d| d != 0.0));

        // Background pixels right next to the splat edge included
        for (i, (&raw, &blurred)) in field.iter().zip(&smoothed).enumerate() {
            if raw == 0.0 {
                assert_eq!(blurred, 0.0, "pixel {} picked up depth {}", i, blurred);
            } else {
                assert!(blurred < 0.0, "pixel {} lost its depth", i);
            }
        }
    });
}

#[test]
fn test_normal_field_marks_surface_coverage() {
    pollster::block_on(async {
        let Some(ctx) = test_context().await else {
            return;
        };
        let (pipeline, particles) = single_splat(&ctx, 0.2).await;
        render_once(&ctx, &pipeline, &particles);

        let targets = pipeline.targets();
        let smoothed = targets.smoothed.read_f32(&ctx.device, &ctx.queue).expect("readback");
        let normals = targets.normals.read_rgba16_bits(&ctx.device, &ctx.queue).expect("readback");
        assert_eq!(normals.len(), 64 * 64);

        for (depth, texel) in smoothed.iter().zip(&normals) {
            if *depth == 0.0 {
                assert_eq!(*texel, [0; 4]);
            } else {
                assert_eq!(texel[3], HALF_ONE);
            }
        }

        // Facing the camera in the middle of the splat
        let [_, _, z, a] = normals[32 * 64 + 32];
        assert_eq!(a, HALF_ONE);
        assert_eq!(z & HALF_SIGN, 0, "n.z is negative");
        assert_ne!(z, 0);
    });
}

#[test]
fn test_larger_radius_covers_more_pixels() {
    pollster::block_on(async {
        let Some(ctx) = test_context().await else {
            return;
        };
        let covered = |field: Vec<f32>| field.iter().filter(|&&d| d != 0.0).count();

        let (mut pipeline, particles) = single_splat(&ctx, 0.1).await;
        render_once(&ctx, &pipeline, &particles);
        let small = covered(pipeline.targets().depth_field.read_f32(&ctx.device, &ctx.queue).expect("readback"));

        let mut params = FluidConfig::default().render;
        params.particle_radius = 0.3;
        pipeline.set_params(&ctx.queue, &params);
        pipeline.update_camera(&ctx.queue, &Camera::new());
        render_once(&ctx, &pipeline, &particles);
        let large = covered(pipeline.targets().depth_field.read_f32(&ctx.device, &ctx.queue).expect("readback"));

        assert!(small > 0);
        assert!(large > small, "radius 0.3 covered {} pixels, 0.1 covered {}", large, small);
    });
}

#[test]
fn test_oversized_targets_are_rejected() {
    pollster::block_on(async {
        let Some(ctx) = test_context().await else {
            return;
        };
        let too_wide = ctx.device.limits().max_texture_dimension_2d + 1;
        let result = RenderTargets::new(&ctx.device, too_wide, 1).await;
        assert!(matches!(result, Err(PipelineError::IncompleteTarget { .. })));
    });
}

#[test]
fn test_failed_resize_keeps_previous_targets() {
    pollster::block_on(async {
        let Some(ctx) = test_context().await else {
            return;
        };
        let (mut pipeline, particles) = single_splat(&ctx, 0.2).await;
        let too_wide = ctx.device.limits().max_texture_dimension_2d + 1;

        let result = pipeline.resize(&ctx.device, too_wide, 64);
        assert!(matches!(result, Err(PipelineError::IncompleteTarget { .. })));
        assert_eq!(pipeline.targets().size(), (64, 64));

        render_once(&ctx, &pipeline, &particles);
        let field = pipeline.targets().depth_field.read_f32(&ctx.device, &ctx.queue).expect("readback");
        assert!(field[32 * 64 + 32] < 0.0);
    });
}

#[test]
fn test_oversized_environment_is_rejected() {
    pollster::block_on(async {
        let Some(ctx) = test_context().await else {
            return;
        };
        let (mut pipeline, particles) = single_splat(&ctx, 0.2).await;
        let too_wide = ctx.device.limits().max_texture_dimension_2d + 1;
        let image = EnvironmentImage::from_rgba(vec![128; too_wide as usize * 4], too_wide, 1).expect("image");

        let result = pipeline.set_environment(&ctx.device, &ctx.queue, &image);
        assert!(matches!(result, Err(PipelineError::IncompleteTarget { .. })));
        render_once(&ctx, &pipeline, &particles);

        let small = EnvironmentImage::from_rgba(vec![200; 2 * 2 * 4], 2, 2).expect("image");
        pipeline.set_environment(&ctx.device, &ctx.queue, &small).expect("2x2 environment");
        render_once(&ctx, &pipeline, &particles);
        pipeline.clear_environment(&ctx.device, &ctx.queue);
        render_once(&ctx, &pipeline, &particles);

        let field = pipeline.targets().depth_field.read_f32(&ctx.device, &ctx.queue).expect("readback");
        assert!(field[32 * 64 + 32] < 0.0);
    });
}
