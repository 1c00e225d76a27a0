//! Benchmarks for shape sampling, target encoding, shader assembly and the
//! CPU step.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use quicksilver::shaders;
use quicksilver::{CpuSimulator, FluidConfig, ShapeKind, ShapeSampler, ShapeTexture, StepInputs, TouchPoint};

fn bench_shape_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("shape_sample");

    for kind in ShapeKind::ALL {
        group.bench_with_input(BenchmarkId::new(kind.name(), 16_384), &kind, |b, &kind| {
            let mut sampler = ShapeSampler::new(7, 0.6);
            b.iter(|| black_box(sampler.sample(kind, 16_384)))
        });
    }

    group.finish();
}

fn bench_texture_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("shape_texture_encode");

    for count in [1_024u32, 16_384, 65_536] {
        let points = ShapeSampler::new(7, 0.6).sample(ShapeKind::Heart, count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &points, |b, points| {
            b.iter(|| black_box(ShapeTexture::encode(points)))
        });
    }

    group.finish();
}

fn bench_shader_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("shader_source");

    group.bench_function("simulation", |b| b.iter(|| black_box(shaders::simulation_shader())));
    group.bench_function("shade", |b| b.iter(|| black_box(shaders::shade_shader())));

    group.finish();
}

fn bench_cpu_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_step");

    let mut touches = [TouchPoint::default(); 5];
    touches[0] = TouchPoint {
        x: 0.3,
        y: 0.3,
        strength: 1.0,
        active: true,
    };
    let inputs = StepInputs {
        gravity: Vec3::NEG_Y,
        touches,
    };

    for count in [1_024u32, 16_384] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut sim = CpuSimulator::new(&FluidConfig::default().with_particle_count(count));
            b.iter(|| sim.step(black_box(1.0 / 60.0), &inputs))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_shape_sampling,
    bench_texture_encode,
    bench_shader_assembly,
    bench_cpu_step,
);
criterion_main!(benches);
