// ============================================================================
// AR 锚定上下文
// 世界原点锚点、相机（视点）锚点与会话重建
// ============================================================================

use crate::ecs::Transform;
use crate::impl_default;
use crate::scene::SceneGraph;
use bevy_ecs::entity::Entity;
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// 视图姿态
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl_default!(Pose {
    position: Vec3::ZERO,
    orientation: Quat::IDENTITY,
});

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    pub fn inverse(&self) -> Self {
        let inv_orientation = self.orientation.inverse();
        Self {
            position: inv_orientation * (-self.position),
            orientation: inv_orientation,
        }
    }

    pub fn to_transform(&self) -> Transform {
        Transform {
            pos: self.position,
            rot: self.orientation,
            scale: Vec3::ONE,
        }
    }
}

/// AR 会话
///
/// 每次 `reset` 都会移除全部锚点，再重新创建世界原点锚点（单位姿态）
/// 和跟随相机的视点锚点。锚点句柄不拥有实体，使用前需确认仍然存在。
#[derive(Debug, Default)]
pub struct ArSession {
    world_origin: Option<Entity>,
    pov: Option<Entity>,
    camera_pose: Pose,
    resets: u64,
}

impl ArSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 重建锚定上下文
    pub fn reset(&mut self, scene: &mut SceneGraph) {
        let removed = scene.remove_anchors();
        let world_origin = scene.spawn_anchor(Transform::default());
        let pov = scene.spawn_anchor(self.camera_pose.to_transform());

        self.world_origin = Some(world_origin);
        self.pov = Some(pov);
        self.resets += 1;

        tracing::info!(
            target: "xr",
            removed,
            ?world_origin,
            ?pov,
            resets = self.resets,
            "AR session reset"
        );
    }

    /// 更新相机姿态，视点锚点随之移动
    pub fn set_camera_pose(&mut self, scene: &mut SceneGraph, pose: Pose) {
        self.camera_pose = pose;
        if let Some(pov) = self.pov {
            if !scene.set_transform(pov, pose.to_transform()) {
                tracing::debug!(target: "xr", ?pov, "point-of-view anchor is gone");
                self.pov = None;
            }
        }
    }

    pub fn camera_pose(&self) -> Pose {
        self.camera_pose
    }

    pub fn world_origin(&self) -> Option<Entity> {
        self.world_origin
    }

    pub fn pov(&self) -> Option<Entity> {
        self.pov
    }

    /// 会话已重建的次数
    pub fn resets(&self) -> u64 {
        self.resets
    }
}
