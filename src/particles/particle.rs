//! 运动学粒子
//!
//! 以帧为时间单位：每次 `update` 年龄加 1，`velocity += acceleration`，
//! 位置前进 `velocity`。缩放随年龄从 0 长到 1，透明度从 1 衰减到 0。

use crate::ecs::{Material, SphereMesh, Transform};
use crate::scene::SceneGraph;
use bevy_ecs::entity::Entity;
use glam::Vec3;

#[derive(Debug)]
pub struct Particle {
    entity: Entity,
    lifespan: f32,
    age: f32,
    velocity: Vec3,
    acceleration: Vec3,
}

impl Particle {
    /// 在 `parent` 下创建粒子实体（红色球体）
    pub fn new(
        scene: &mut SceneGraph,
        parent: Entity,
        transform: Transform,
        radius: f32,
        lifespan: f32,
        acceleration: Vec3,
    ) -> Self {
        let entity = scene.spawn(transform);
        scene.insert_mesh(entity, SphereMesh { radius });
        scene.set_material(entity, Material::simple(Material::RED));
        scene.attach(entity, parent);

        Self {
            entity,
            lifespan,
            age: 0.0,
            velocity: Vec3::ZERO,
            acceleration,
        }
    }

    /// 设置初速度
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// 推进一帧
    pub fn update(&mut self, scene: &mut SceneGraph) {
        self.age += 1.0;
        self.velocity += self.acceleration;

        scene.translate_by(self.entity, self.velocity);
        scene.set_uniform_scale(self.entity, self.age / self.lifespan);
        scene.set_opacity(self.entity, (self.lifespan - self.age) / self.lifespan);
    }

    pub fn is_dead(&self) -> bool {
        self.age >= self.lifespan
    }

    /// 卸载并销毁场景实体
    pub fn despawn(self, scene: &mut SceneGraph) {
        scene.despawn(self.entity);
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn age(&self) -> f32 {
        self.age
    }

    pub fn lifespan(&self) -> f32 {
        self.lifespan
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(scene: &mut SceneGraph, lifespan: f32, acceleration: Vec3) -> (Entity, Particle) {
        let parent = scene.spawn(Transform::default());
        let particle = Particle::new(
            scene,
            parent,
            Transform::default(),
            0.05,
            lifespan,
            acceleration,
        );
        (parent, particle)
    }

    #[test]
    fn test_new_particle_is_attached() {
        let mut scene = SceneGraph::new();
        let (parent, particle) = spawn(&mut scene, 10.0, Vec3::ZERO);

        assert_eq!(scene.parent(particle.entity()), Some(parent));
        assert_eq!(scene.mesh(particle.entity()), Some(SphereMesh { radius: 0.05 }));
        let material = scene.material(particle.entity()).unwrap();
        assert_eq!(material.color, Material::RED);
        assert_eq!(material.roughness, 0.5);
        assert_eq!(particle.age(), 0.0);
        assert!(!particle.is_dead());
    }

    #[test]
    fn test_update_integrates_motion() {
        let mut scene = SceneGraph::new();
        let (_, mut particle) = spawn(&mut scene, 10.0, Vec3::new(0.0, 0.0, -0.01));

        particle.update(&mut scene);
        particle.update(&mut scene);

        // v1 = -0.01, v2 = -0.02，位移合计 -0.03
        assert!((particle.velocity().z + 0.02).abs() < 1e-6);
        let pos = scene.transform(particle.entity()).unwrap().pos;
        assert!((pos.z + 0.03).abs() < 1e-6);
        assert_eq!(pos.x, 0.0);
        assert_eq!(particle.acceleration(), Vec3::new(0.0, 0.0, -0.01));
    }

    #[test]
    fn test_scale_and_opacity_follow_age() {
        let mut scene = SceneGraph::new();
        let (_, mut particle) = spawn(&mut scene, 4.0, Vec3::ZERO);

        particle.update(&mut scene);

        let transform = scene.transform(particle.entity()).unwrap();
        assert_eq!(transform.scale, Vec3::splat(0.25));
        assert_eq!(scene.material(particle.entity()).unwrap().opacity(), 0.75);
    }

    #[test]
    fn test_death_threshold() {
        let mut scene = SceneGraph::new();
        let (_, mut particle) = spawn(&mut scene, 3.0, Vec3::ZERO);

        particle.update(&mut scene);
        particle.update(&mut scene);
        assert!(!particle.is_dead());

        particle.update(&mut scene);
        assert_eq!(particle.age(), 3.0);
        assert!(particle.is_dead());
    }

    #[test]
    fn test_with_velocity() {
        let mut scene = SceneGraph::new();
        let (_, particle) = spawn(&mut scene, 3.0, Vec3::ZERO);
        let mut particle = particle.with_velocity(Vec3::X);

        particle.update(&mut scene);
        assert_eq!(scene.transform(particle.entity()).unwrap().pos, Vec3::X);
    }

    #[test]
    fn test_despawn_detaches() {
        let mut scene = SceneGraph::new();
        let (parent, particle) = spawn(&mut scene, 3.0, Vec3::ZERO);
        let entity = particle.entity();

        particle.despawn(&mut scene);
        assert!(!scene.contains(entity));
        assert!(scene.children(parent).is_empty());
    }
}
