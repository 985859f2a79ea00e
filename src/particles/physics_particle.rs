//! 物理粒子
//!
//! 年龄取墙钟时间 `now - birth`，寿命以秒计。生成时施加一次冲量，
//! 之后的运动完全由刚体模拟决定；这里只负责缩放曲线和碰撞变色。

use super::{ease_out_sine, Placement};
use crate::ecs::{Material, SphereMesh};
use crate::physics::{particle_groups, BallBody, PhysicsWorld};
use crate::scene::SceneGraph;
use bevy_ecs::entity::Entity;
use glam::{Quat, Vec3};
use rapier3d::prelude::RigidBodyHandle;
use std::time::{Duration, Instant};

/// 物理粒子参数
#[derive(Debug, Clone, Copy)]
pub struct PhysicsParticleDesc {
    pub radius: f32,
    pub mass: f32,
    pub lifespan: Duration,
    /// 世界空间冲量
    pub impulse: Vec3,
}

#[derive(Debug)]
pub struct PhysicsParticle {
    entity: Entity,
    body: RigidBodyHandle,
    lifespan: Duration,
    birth: Instant,
    collided: bool,
}

impl PhysicsParticle {
    /// 创建粒子实体与刚体，并施加发射冲量
    pub(crate) fn new(
        scene: &mut SceneGraph,
        physics: &mut PhysicsWorld,
        placement: Placement,
        desc: PhysicsParticleDesc,
        birth: Instant,
    ) -> Self {
        let entity = scene.spawn(placement.transform);
        scene.insert_mesh(entity, SphereMesh { radius: desc.radius });
        scene.set_material(entity, Material::simple(Material::RED));
        scene.attach(entity, placement.parent);

        // 缩放归零之前读取世界位姿
        let (position, rotation) = scene
            .world_matrix(entity)
            .map(|m| {
                let (_, rotation, position) = m.to_scale_rotation_translation();
                (position, rotation)
            })
            .unwrap_or((Vec3::ZERO, Quat::IDENTITY));
        scene.set_uniform_scale(entity, 0.0);

        let body = physics.spawn_ball(
            entity,
            BallBody {
                radius: desc.radius,
                mass: desc.mass,
                position,
                rotation,
                groups: particle_groups(),
            },
        );
        physics.apply_impulse(body, desc.impulse);

        Self {
            entity,
            body,
            lifespan: desc.lifespan,
            birth,
            collided: false,
        }
    }

    /// 按 `now` 时刻的年龄更新缩放：`(easeOutSine(age/lifespan) + 0.1) / 1.1`
    pub fn update_at(&mut self, scene: &mut SceneGraph, now: Instant) {
        let x = self.life_fraction(now);
        scene.set_uniform_scale(self.entity, (ease_out_sine(x) + 0.1) / 1.1);
    }

    pub fn update(&mut self, scene: &mut SceneGraph) {
        self.update_at(scene, Instant::now());
    }

    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.birth)
    }

    pub fn age(&self) -> Duration {
        self.age_at(Instant::now())
    }

    /// 年龄严格超过寿命才算死亡
    pub fn is_dead_at(&self, now: Instant) -> bool {
        self.age_at(now) > self.lifespan
    }

    pub fn is_dead(&self) -> bool {
        self.is_dead_at(Instant::now())
    }

    fn life_fraction(&self, now: Instant) -> f32 {
        (self.age_at(now).as_secs_f64() / self.lifespan.as_secs_f64()) as f32
    }

    /// 标记为已碰撞并改为碰撞色，首次标记时返回 `true`
    pub fn mark_collided(&mut self, scene: &mut SceneGraph) -> bool {
        if self.collided {
            return false;
        }
        self.collided = true;
        scene.set_material(self.entity, Material::simple(Material::BLUE));
        true
    }

    pub fn has_collided(&self) -> bool {
        self.collided
    }

    /// 移除刚体并销毁场景实体
    pub fn despawn(self, scene: &mut SceneGraph, physics: &mut PhysicsWorld) {
        physics.remove_body(self.body);
        scene.despawn(self.entity);
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn lifespan(&self) -> Duration {
        self.lifespan
    }

    pub fn birth(&self) -> Instant {
        self.birth
    }
}
