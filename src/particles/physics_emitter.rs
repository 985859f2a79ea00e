//! 物理粒子发射器

use super::{
    emitter_rng, negative_upper_half, placement, upper_half, EmitterStats, PhysicsParticle,
    PhysicsParticleDesc,
};
use crate::config::PhysicsEmitterConfig;
use crate::core::error::{SceneError, SimulationResult};
use crate::ecs::Transform;
use crate::physics::{CollisionSubscription, PhysicsWorld};
use crate::scene::SceneGraph;
use bevy_ecs::entity::Entity;
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// 物理发射器
///
/// 粒子的冲量为 `(0, upward_impulse, m)`，`m` 取自
/// `[-max_impulse_magnitude, -max_impulse_magnitude/2]`，再按发射器世界朝向旋转。
/// 碰撞事件通过 `实体 -> 池位` 映射查找池内粒子。
pub struct PhysicsEmitter {
    entity: Entity,
    world_anchor: Option<Entity>,
    config: PhysicsEmitterConfig,
    particles: Vec<PhysicsParticle>,
    slots: HashMap<Entity, usize>,
    subscription: Option<CollisionSubscription>,
    rng: StdRng,
    stats: EmitterStats,
}

impl PhysicsEmitter {
    /// 在 `parent` 下 `offset` 处创建发射器节点
    pub fn new(
        scene: &mut SceneGraph,
        parent: Entity,
        offset: Vec3,
        world_anchor: Option<Entity>,
        config: PhysicsEmitterConfig,
        seed: Option<u64>,
    ) -> SimulationResult<Self> {
        config.validate()?;
        if !scene.contains(parent) {
            return Err(SceneError::EntityNotFound(format!("emitter parent {parent:?}")).into());
        }

        let entity = scene.spawn(Transform::from_translation(offset));
        scene.attach(entity, parent);

        tracing::debug!(
            target: "particles",
            ?entity,
            capacity = config.count,
            "physics emitter created"
        );

        Ok(Self {
            entity,
            world_anchor,
            config,
            particles: Vec::new(),
            slots: HashMap::new(),
            subscription: None,
            rng: emitter_rng(seed),
            stats: EmitterStats::default(),
        })
    }

    pub fn start(&mut self, scene: &mut SceneGraph, physics: &mut PhysicsWorld) {
        self.start_at(scene, physics, Instant::now());
    }

    /// 先订阅碰撞事件，再生成满池粒子
    pub fn start_at(&mut self, scene: &mut SceneGraph, physics: &mut PhysicsWorld, now: Instant) {
        if self.subscription.is_none() {
            self.subscription = Some(physics.subscribe_collisions());
        }
        if !self.particles.is_empty() {
            return;
        }

        self.particles.reserve_exact(self.config.count);
        for slot in 0..self.config.count {
            let particle = self.spawn_particle(scene, physics, now);
            self.slots.insert(particle.entity(), slot);
            self.particles.push(particle);
        }
        tracing::info!(
            target: "particles",
            emitter = ?self.entity,
            count = self.particles.len(),
            "physics emitter started"
        );
    }

    pub fn update(&mut self, scene: &mut SceneGraph, physics: &mut PhysicsWorld) {
        self.update_at(scene, physics, Instant::now());
    }

    /// 处理已送达的碰撞，再以 `now` 为当前时刻推进粒子
    pub fn update_at(&mut self, scene: &mut SceneGraph, physics: &mut PhysicsWorld, now: Instant) {
        self.handle_collisions(scene);

        for index in (0..self.particles.len()).rev() {
            self.particles[index].update_at(scene, now);
            if !self.particles[index].is_dead_at(now) {
                continue;
            }

            let replacement = self.spawn_particle(scene, physics, now);
            self.slots.insert(replacement.entity(), index);
            let dead = std::mem::replace(&mut self.particles[index], replacement);
            self.slots.remove(&dead.entity());
            tracing::trace!(target: "particles", entity = ?dead.entity(), "physics particle recycled");
            dead.despawn(scene, physics);
            self.stats.recycled += 1;
        }
    }

    /// 把碰撞参与者中属于本池的粒子改为碰撞色，返回命中次数
    ///
    /// 未订阅（未启动或已停止）时什么也不做。
    pub fn handle_collisions(&mut self, scene: &mut SceneGraph) -> usize {
        let Some(subscription) = &self.subscription else {
            return 0;
        };

        let mut hits = 0;
        for event in subscription.drain() {
            for entity in event.participants() {
                let Some(&slot) = self.slots.get(&entity) else {
                    continue;
                };
                if let Some(particle) = self.particles.get_mut(slot) {
                    if particle.mark_collided(scene) {
                        tracing::trace!(target: "particles", ?entity, "particle collided");
                    }
                    hits += 1;
                }
            }
        }
        self.stats.collisions += hits as u64;
        hits
    }

    /// 取消碰撞订阅，卸载全部粒子并清空池，可重复调用
    pub fn stop(&mut self, scene: &mut SceneGraph, physics: &mut PhysicsWorld) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        if self.particles.is_empty() {
            return;
        }

        let count = self.particles.len();
        self.slots.clear();
        for particle in self.particles.drain(..) {
            particle.despawn(scene, physics);
        }
        tracing::info!(target: "particles", emitter = ?self.entity, count, "physics emitter stopped");
    }

    /// 停止并销毁发射器节点
    pub fn teardown(mut self, scene: &mut SceneGraph, physics: &mut PhysicsWorld) {
        self.stop(scene, physics);
        scene.despawn(self.entity);
    }

    fn spawn_particle(
        &mut self,
        scene: &mut SceneGraph,
        physics: &mut PhysicsWorld,
        now: Instant,
    ) -> PhysicsParticle {
        let placed = placement(scene, self.entity, self.world_anchor);

        let emitter_rotation = scene
            .world_matrix(self.entity)
            .map(|m| m.to_scale_rotation_translation().1)
            .unwrap_or(Quat::IDENTITY);
        let magnitude =
            negative_upper_half(&mut self.rng, f64::from(self.config.max_impulse_magnitude)) as f32;
        let impulse = emitter_rotation * Vec3::new(0.0, self.config.upward_impulse, magnitude);
        let lifespan = Duration::from_secs_f64(upper_half(&mut self.rng, self.config.max_lifespan_secs));

        let particle = PhysicsParticle::new(
            scene,
            physics,
            placed,
            PhysicsParticleDesc {
                radius: self.config.radius,
                mass: self.config.mass,
                lifespan,
                impulse,
            },
            now,
        );
        self.stats.spawned += 1;
        tracing::trace!(
            target: "particles",
            entity = ?particle.entity(),
            lifespan_secs = lifespan.as_secs_f64(),
            "physics particle spawned"
        );
        particle
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn world_anchor(&self) -> Option<Entity> {
        self.world_anchor
    }

    pub fn capacity(&self) -> usize {
        self.config.count
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[PhysicsParticle] {
        &self.particles
    }

    /// 粒子实体在池中的位置
    pub fn slot_of(&self, entity: Entity) -> Option<usize> {
        self.slots.get(&entity).copied()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn stats(&self) -> EmitterStats {
        self.stats
    }
}
