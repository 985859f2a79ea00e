//! 运动学粒子发射器

use super::{emitter_rng, negative_upper_half, placement, upper_half, EmitterStats, Particle};
use crate::config::KinematicConfig;
use crate::core::error::{SceneError, SimulationResult};
use crate::ecs::Transform;
use crate::scene::SceneGraph;
use bevy_ecs::entity::Entity;
use glam::Vec3;
use rand::rngs::StdRng;

/// 运动学发射器
///
/// 拥有固定容量的粒子池。新粒子的加速度只有 Z 分量，取自
/// `[-max_acceleration, -max_acceleration/2]`，寿命取自 `[max_lifespan/2, max_lifespan]`。
pub struct KinematicEmitter {
    entity: Entity,
    world_anchor: Option<Entity>,
    config: KinematicConfig,
    particles: Vec<Particle>,
    rng: StdRng,
    stats: EmitterStats,
}

impl KinematicEmitter {
    /// 在 `parent` 下 `offset` 处创建发射器节点
    ///
    /// `world_anchor` 只用于计算新粒子的挂载变换，发射器不拥有它。
    pub fn new(
        scene: &mut SceneGraph,
        parent: Entity,
        offset: Vec3,
        world_anchor: Option<Entity>,
        config: KinematicConfig,
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
            "kinematic emitter created"
        );

        Ok(Self {
            entity,
            world_anchor,
            config,
            particles: Vec::new(),
            rng: emitter_rng(seed),
            stats: EmitterStats::default(),
        })
    }

    /// 生成满池粒子，已在运行时不做任何事
    pub fn start(&mut self, scene: &mut SceneGraph) {
        if !self.particles.is_empty() {
            return;
        }
        self.particles.reserve_exact(self.config.count);
        for _ in 0..self.config.count {
            let particle = self.spawn_particle(scene);
            self.particles.push(particle);
        }
        tracing::info!(
            target: "particles",
            emitter = ?self.entity,
            count = self.particles.len(),
            "kinematic emitter started"
        );
    }

    /// 推进一帧，死亡的粒子在原池位被替换
    pub fn update(&mut self, scene: &mut SceneGraph) {
        // 倒序遍历
        for index in (0..self.particles.len()).rev() {
            self.particles[index].update(scene);
            if !self.particles[index].is_dead() {
                continue;
            }

            let replacement = self.spawn_particle(scene);
            let dead = std::mem::replace(&mut self.particles[index], replacement);
            tracing::trace!(target: "particles", entity = ?dead.entity(), "particle recycled");
            dead.despawn(scene);
            self.stats.recycled += 1;
        }
    }

    /// 卸载全部粒子并清空池，可重复调用
    pub fn stop(&mut self, scene: &mut SceneGraph) {
        if self.particles.is_empty() {
            return;
        }
        let count = self.particles.len();
        for particle in self.particles.drain(..) {
            particle.despawn(scene);
        }
        tracing::info!(target: "particles", emitter = ?self.entity, count, "kinematic emitter stopped");
    }

    /// 停止并销毁发射器节点
    pub fn teardown(mut self, scene: &mut SceneGraph) {
        self.stop(scene);
        scene.despawn(self.entity);
    }

    fn spawn_particle(&mut self, scene: &mut SceneGraph) -> Particle {
        let placed = placement(scene, self.entity, self.world_anchor);
        let transform = if placed.on_world_anchor {
            placed.transform.with_uniform_scale(0.0)
        } else {
            placed.transform
        };

        let acceleration = Vec3::new(
            0.0,
            0.0,
            negative_upper_half(&mut self.rng, f64::from(self.config.max_acceleration)) as f32,
        );
        let lifespan = upper_half(&mut self.rng, f64::from(self.config.max_lifespan)) as f32;

        let particle = Particle::new(
            scene,
            placed.parent,
            transform,
            self.config.radius,
            lifespan,
            acceleration,
        );
        self.stats.spawned += 1;
        tracing::trace!(target: "particles", entity = ?particle.entity(), lifespan, "particle spawned");
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

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn stats(&self) -> EmitterStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(count: usize) -> KinematicConfig {
        KinematicConfig {
            count,
            max_acceleration: 0.01,
            max_lifespan: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut scene = SceneGraph::new();
        let parent = scene.spawn(Transform::default());

        let result = KinematicEmitter::new(&mut scene, parent, Vec3::ZERO, None, config(0), None);
        assert!(result.is_err());

        let still = KinematicConfig {
            max_acceleration: 0.0,
            ..config(1)
        };
        let result = KinematicEmitter::new(&mut scene, parent, Vec3::ZERO, None, still, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_rejects_missing_parent() {
        let mut scene = SceneGraph::new();
        let parent = scene.spawn(Transform::default());
        scene.despawn(parent);

        let result = KinematicEmitter::new(&mut scene, parent, Vec3::ZERO, None, config(1), None);
        assert!(matches!(
            result,
            Err(crate::core::error::SimulationError::Scene(SceneError::EntityNotFound(_)))
        ));
    }

    #[test]
    fn test_start_fills_pool_on_world_anchor() {
        let mut scene = SceneGraph::new();
        let anchor = scene.spawn_anchor(Transform::default());
        let camera = scene.spawn(Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        let mut emitter = KinematicEmitter::new(
            &mut scene,
            camera,
            Vec3::new(0.0, 0.0, -0.5),
            Some(anchor),
            config(5),
            Some(1),
        )
        .unwrap();

        emitter.start(&mut scene);
        assert_eq!(emitter.len(), 5);
        assert_eq!(scene.children(anchor).len(), 5);

        let first = emitter.particles()[0].entity();
        let transform = scene.transform(first).unwrap();
        assert!(transform.pos.abs_diff_eq(Vec3::new(0.0, 1.0, -0.5), 1e-5));
        assert_eq!(transform.scale, Vec3::ZERO);

        // 重复 start 不会再生成
        emitter.start(&mut scene);
        assert_eq!(emitter.len(), 5);
        assert_eq!(emitter.stats().spawned, 5);
    }

    #[test]
    fn test_without_anchor_parents_to_emitter() {
        let mut scene = SceneGraph::new();
        let camera = scene.spawn(Transform::default());
        let mut emitter =
            KinematicEmitter::new(&mut scene, camera, Vec3::ZERO, None, config(3), Some(2)).unwrap();

        emitter.start(&mut scene);

        for particle in emitter.particles() {
            assert_eq!(scene.parent(particle.entity()), Some(emitter.entity()));
            assert_eq!(scene.transform(particle.entity()).unwrap().scale, Vec3::ONE);
        }
    }

    #[test]
    fn test_acceleration_and_lifespan_ranges() {
        let mut scene = SceneGraph::new();
        let camera = scene.spawn(Transform::default());
        let mut emitter =
            KinematicEmitter::new(&mut scene, camera, Vec3::ZERO, None, config(200), Some(3)).unwrap();

        emitter.start(&mut scene);

        for particle in emitter.particles() {
            let a = particle.acceleration();
            assert_eq!(a.x, 0.0);
            assert_eq!(a.y, 0.0);
            assert!(a.z >= -0.01 && a.z <= -0.005);
            assert!(particle.lifespan() >= 5.0 && particle.lifespan() <= 10.0);
        }
    }

    #[test]
    fn test_update_keeps_pool_size() {
        let mut scene = SceneGraph::new();
        let camera = scene.spawn(Transform::default());
        let mut emitter =
            KinematicEmitter::new(&mut scene, camera, Vec3::ZERO, None, config(20), Some(4)).unwrap();
        emitter.start(&mut scene);

        for _ in 0..50 {
            emitter.update(&mut scene);
            assert_eq!(emitter.len(), 20);
            assert!(emitter.particles().iter().all(|p| !p.is_dead()));
        }

        assert!(emitter.stats().recycled > 0);
        assert_eq!(
            emitter.stats().spawned,
            20 + emitter.stats().recycled
        );
        // 场景中只剩相机、发射器和存活粒子
        assert_eq!(scene.entity_count(), 2 + 20);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut scene = SceneGraph::new();
        let camera = scene.spawn(Transform::default());
        let mut emitter =
            KinematicEmitter::new(&mut scene, camera, Vec3::ZERO, None, config(4), None).unwrap();
        emitter.start(&mut scene);

        emitter.stop(&mut scene);
        assert!(emitter.is_empty());
        assert!(scene.children(emitter.entity()).is_empty());

        emitter.stop(&mut scene);
        assert!(emitter.is_empty());

        // 停止后可以重新启动
        emitter.start(&mut scene);
        assert_eq!(emitter.len(), 4);
    }

    #[test]
    fn test_teardown_removes_emitter() {
        let mut scene = SceneGraph::new();
        let camera = scene.spawn(Transform::default());
        let mut emitter =
            KinematicEmitter::new(&mut scene, camera, Vec3::ZERO, None, config(4), None).unwrap();
        emitter.start(&mut scene);
        let entity = emitter.entity();

        emitter.teardown(&mut scene);
        assert!(!scene.contains(entity));
        assert_eq!(scene.entity_count(), 1);
    }
}
