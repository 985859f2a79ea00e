//! 刚体物理宿主
//!
//! rapier3d 物理世界：球形刚体、一次性冲量、粒子碰撞分组、静态环境几何体，
//! 以及把碰撞开始事件投递给订阅者的事件总线。

pub mod events;

use crate::core::error::{PhysicsError, PhysicsResult};
use crate::ecs::Transform;
use crate::impl_default;
use crate::scene::SceneGraph;
use bevy_ecs::entity::Entity;
use glam::{Mat4, Quat, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude::DefaultBroadPhase;
use rapier3d::prelude::*;

pub use events::{CollisionBegan, CollisionEventBus, CollisionSubscription};
use events::{entity_from_user_data, entity_to_user_data};

/// 粒子所在的碰撞组
pub const PARTICLE_GROUP: Group = Group::GROUP_1;
/// 环境几何体所在的碰撞组
pub const ENVIRONMENT_GROUP: Group = Group::GROUP_2;

/// 粒子碰撞过滤：与环境碰撞，同组粒子之间互不碰撞
pub fn particle_groups() -> InteractionGroups {
    InteractionGroups::new(PARTICLE_GROUP, Group::ALL.difference(PARTICLE_GROUP))
}

// --- Resources ---

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: Box<dyn BroadPhase>,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub query_pipeline: QueryPipeline,
    events: CollisionEventBus,
}

impl_default!(PhysicsWorld {
    gravity: vector![0.0, -9.81, 0.0],
    integration_parameters: IntegrationParameters::default(),
    physics_pipeline: PhysicsPipeline::new(),
    island_manager: IslandManager::new(),
    broad_phase: Box::new(DefaultBroadPhase::new()),
    narrow_phase: NarrowPhase::new(),
    impulse_joint_set: ImpulseJointSet::new(),
    multibody_joint_set: MultibodyJointSet::new(),
    ccd_solver: CCDSolver::new(),
    rigid_body_set: RigidBodySet::new(),
    collider_set: ColliderSet::new(),
    query_pipeline: QueryPipeline::new(),
    events: CollisionEventBus::new(),
});

/// 球形刚体描述
#[derive(Clone, Copy, Debug)]
pub struct BallBody {
    pub radius: f32,
    pub mass: f32,
    /// 世界空间位置
    pub position: Vec3,
    /// 世界空间朝向
    pub rotation: Quat,
    pub groups: InteractionGroups,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以指定重力创建
    pub fn with_gravity(gravity: Vec3) -> PhysicsResult<Self> {
        if !gravity.is_finite() {
            return Err(PhysicsError::InvalidConfig(format!(
                "gravity must be finite, got {gravity:?}"
            )));
        }
        Ok(Self {
            gravity: vector![gravity.x, gravity.y, gravity.z],
            ..Self::default()
        })
    }

    /// 推进一步并分发本步产生的碰撞开始事件
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt.max(0.001);
        let forwarder = self.events.forwarder();
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut *self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &forwarder,
        );
        let dispatched = self.events.dispatch();
        if dispatched > 0 {
            tracing::trace!(target: "physics", dispatched, "collision events dispatched");
        }
    }

    // --- 碰撞事件 ---

    pub fn subscribe_collisions(&mut self) -> CollisionSubscription {
        self.events.subscribe()
    }

    /// 跨线程的事件入口，在下一次 `step` / `dispatch_collisions` 时分发
    pub fn collision_feed(&self) -> crossbeam_channel::Sender<CollisionBegan> {
        self.events.feed()
    }

    pub fn dispatch_collisions(&mut self) -> usize {
        self.events.dispatch()
    }

    /// 立即分发一个碰撞事件
    pub fn publish_collision(&mut self, event: CollisionBegan) {
        self.events.publish(event);
    }

    pub fn collision_subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    // --- 刚体 ---

    /// 为场景实体创建动态球形刚体
    pub fn spawn_ball(&mut self, entity: Entity, desc: BallBody) -> RigidBodyHandle {
        let rotation = UnitQuaternion::new_normalize(Quaternion::new(
            desc.rotation.w,
            desc.rotation.x,
            desc.rotation.y,
            desc.rotation.z,
        ));
        let isometry = Isometry::from_parts(
            Translation::new(desc.position.x, desc.position.y, desc.position.z),
            rotation,
        );
        let rb = RigidBodyBuilder::dynamic()
            .position(isometry)
            .user_data(entity_to_user_data(entity))
            .build();
        let rb_handle = self.rigid_body_set.insert(rb);

        let collider = ColliderBuilder::ball(desc.radius)
            .mass(desc.mass)
            .collision_groups(desc.groups)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(entity_to_user_data(entity))
            .build();

        // 分离借用
        let PhysicsWorld {
            rigid_body_set,
            collider_set,
            ..
        } = self;
        collider_set.insert_with_parent(collider, rb_handle, rigid_body_set);
        // 立即计算质量属性，生成后马上施加的冲量才有效
        if let Some(rb) = rigid_body_set.get_mut(rb_handle) {
            rb.recompute_mass_properties_from_colliders(collider_set);
        }

        rb_handle
    }

    /// 施加一次性线冲量（世界空间）
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) -> bool {
        match self.rigid_body_set.get_mut(handle) {
            Some(rb) => {
                rb.apply_impulse(vector![impulse.x, impulse.y, impulse.z], true);
                true
            }
            None => false,
        }
    }

    /// 移除刚体及其碰撞体
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn body_position(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(handle).map(|rb| {
            let pos = rb.translation();
            Vec3::new(pos.x, pos.y, pos.z)
        })
    }

    pub fn body_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(handle).map(|rb| {
            let vel = rb.linvel();
            Vec3::new(vel.x, vel.y, vel.z)
        })
    }

    /// 添加静态地面，代替场景重建得到的环境网格
    pub fn add_static_floor(&mut self, height: f32) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(50.0, 0.1, 50.0)
            .translation(vector![0.0, height - 0.1, 0.0])
            .collision_groups(InteractionGroups::new(ENVIRONMENT_GROUP, Group::ALL))
            .build();
        self.collider_set.insert(collider)
    }

    /// 把刚体的世界位姿写回场景变换（换算到父空间，保留缩放）
    pub fn sync_transforms(&self, scene: &mut SceneGraph) -> usize {
        let mut synced = 0;
        for (_, rb) in self.rigid_body_set.iter() {
            let Some(entity) = entity_from_user_data(rb.user_data) else {
                continue;
            };
            let Some(current) = scene.transform(entity) else {
                continue;
            };

            let pos = rb.translation();
            let rot = rb.rotation();
            let body_world = Mat4::from_rotation_translation(
                Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w),
                Vec3::new(pos.x, pos.y, pos.z),
            );
            let parent_world = scene
                .parent(entity)
                .and_then(|parent| scene.world_matrix(parent))
                .unwrap_or(Mat4::IDENTITY);

            let local = Transform::from_matrix(parent_world.inverse() * body_world);
            scene.set_transform(
                entity,
                Transform {
                    pos: local.pos,
                    rot: local.rot,
                    scale: current.scale,
                },
            );
            synced += 1;
        }
        synced
    }
}
