//! 粒子系统性能基准测试
//!
//! 测试发射器逐帧更新与整池重建的耗时

use ar_particles::config::{KinematicConfig, PhysicsEmitterConfig};
use ar_particles::ecs::Transform;
use ar_particles::particles::{KinematicEmitter, PhysicsEmitter};
use ar_particles::physics::PhysicsWorld;
use ar_particles::scene::SceneGraph;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use std::hint::black_box;

fn kinematic_setup(count: usize) -> (SceneGraph, KinematicEmitter) {
    let mut scene = SceneGraph::new();
    let anchor = scene.spawn_anchor(Transform::default());
    let camera = scene.spawn(Transform::default());
    let config = KinematicConfig {
        count,
        ..Default::default()
    };
    let emitter = KinematicEmitter::new(
        &mut scene,
        camera,
        Vec3::new(0.0, 0.0, -0.5),
        Some(anchor),
        config,
        Some(1),
    )
    .unwrap();
    (scene, emitter)
}

fn bench_kinematic_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("kinematic_update");

    for count in [100, 200, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (mut scene, mut emitter) = kinematic_setup(count);
            emitter.start(&mut scene);
            b.iter(|| {
                emitter.update(&mut scene);
                black_box(emitter.len())
            });
        });
    }

    group.finish();
}

fn bench_kinematic_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("kinematic_rebuild");

    for count in [100, 200].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (mut scene, mut emitter) = kinematic_setup(count);
            b.iter(|| {
                emitter.start(&mut scene);
                emitter.stop(&mut scene);
            });
        });
    }

    group.finish();
}

fn bench_physics_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("physics_frame");

    for count in [100, 200].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let mut scene = SceneGraph::new();
            let mut physics = PhysicsWorld::new();
            physics.add_static_floor(-1.5);
            let anchor = scene.spawn_anchor(Transform::default());
            let camera = scene.spawn(Transform::default());
            let config = PhysicsEmitterConfig {
                count,
                ..Default::default()
            };
            let mut emitter = PhysicsEmitter::new(
                &mut scene,
                camera,
                Vec3::new(0.0, 0.0, -0.5),
                Some(anchor),
                config,
                Some(1),
            )
            .unwrap();
            emitter.start(&mut scene, &mut physics);

            b.iter(|| {
                physics.step(1.0 / 60.0);
                physics.sync_transforms(&mut scene);
                emitter.update(&mut scene, &mut physics);
                black_box(emitter.stats())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_kinematic_update,
    bench_kinematic_rebuild,
    bench_physics_frame
);
criterion_main!(benches);
