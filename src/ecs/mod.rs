use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3, Vec4};

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub pos: Vec3,
    pub rot: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            rot: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(pos: Vec3) -> Self {
        Self {
            pos,
            ..Default::default()
        }
    }

    /// 组合为仿射矩阵（缩放 → 旋转 → 平移）
    pub fn compute_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rot, self.pos)
    }

    /// 从仿射矩阵分解
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rot, pos) = matrix.to_scale_rotation_translation();
        Self { pos, rot, scale }
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }
}

/// 父节点（非拥有）
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// 子节点列表，保持挂载顺序
#[derive(Component, Clone, Debug, Default)]
pub struct Children(pub Vec<Entity>);

/// AR 锚点标记，会话重建时整体移除
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Anchor;

/// 粒子唯一的几何体：球
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct SphereMesh {
    pub radius: f32,
}

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// 线性 RGBA
    pub color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            metallic: 0.0,
            roughness: 0.5,
        }
    }
}

impl Material {
    pub const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
    pub const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

    /// 非金属、粗糙度 0.5 的纯色材质
    pub fn simple(color: Vec4) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    pub fn with_opacity(mut self, alpha: f32) -> Self {
        self.color.w = alpha;
        self
    }

    pub fn opacity(&self) -> f32 {
        self.color.w
    }
}
