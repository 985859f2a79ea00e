//! 场景图
//!
//! 以 `bevy_ecs::World` 作为存储的层级场景：挂载/卸载、变换组合、
//! 相对变换查询以及可视属性（网格、材质、缩放、透明度）设置。
//!
//! 所有操作都是全函数：目标实体不存在时返回 `false` / `None`，不会 panic。

use crate::ecs::{Anchor, Children, Material, Parent, SphereMesh, Transform};
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};

/// 场景图
pub struct SceneGraph {
    world: World,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            world: World::new(),
        }
    }

    /// 底层 ECS 世界（只读）
    pub fn world(&self) -> &World {
        &self.world
    }

    /// 创建根节点
    pub fn spawn(&mut self, transform: Transform) -> Entity {
        self.world.spawn((transform, Children::default())).id()
    }

    /// 创建锚点根节点
    pub fn spawn_anchor(&mut self, transform: Transform) -> Entity {
        self.world
            .spawn((transform, Children::default(), Anchor))
            .id()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.world.get_entity(entity).is_some()
    }

    pub fn is_anchor(&self, entity: Entity) -> bool {
        self.world.get::<Anchor>(entity).is_some()
    }

    pub fn entity_count(&self) -> usize {
        self.world.iter_entities().count()
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.world.get::<Parent>(entity).map(|p| p.0)
    }

    pub fn children(&self, entity: Entity) -> &[Entity] {
        self.world
            .get::<Children>(entity)
            .map(|c| c.0.as_slice())
            .unwrap_or(&[])
    }

    /// 将 `child` 挂到 `parent` 下，已有父节点时先卸载
    ///
    /// 拒绝自挂载、缺失实体以及会形成环的挂载。
    pub fn attach(&mut self, child: Entity, parent: Entity) -> bool {
        if child == parent || !self.contains(child) || !self.contains(parent) {
            return false;
        }
        if self.is_ancestor(child, parent) {
            tracing::warn!(target: "scene", ?child, ?parent, "attach rejected: would create a cycle");
            return false;
        }

        self.detach(child);

        if let Some(mut entity) = self.world.get_entity_mut(child) {
            entity.insert(Parent(parent));
        }
        match self.world.get_mut::<Children>(parent) {
            Some(mut children) => children.0.push(child),
            None => {
                if let Some(mut entity) = self.world.get_entity_mut(parent) {
                    entity.insert(Children(vec![child]));
                }
            }
        }
        true
    }

    /// 从父节点卸载，实体本身保留
    pub fn detach(&mut self, child: Entity) -> bool {
        let Some(parent) = self.parent(child) else {
            return false;
        };
        if let Some(mut children) = self.world.get_mut::<Children>(parent) {
            children.0.retain(|c| *c != child);
        }
        if let Some(mut entity) = self.world.get_entity_mut(child) {
            entity.remove::<Parent>();
        }
        true
    }

    /// 卸载并递归销毁
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.contains(entity) {
            return false;
        }
        self.detach(entity);

        let mut stack = vec![entity];
        while let Some(current) = stack.pop() {
            stack.extend_from_slice(self.children(current));
            self.world.despawn(current);
        }
        true
    }

    /// 移除所有锚点及其子树
    pub fn remove_anchors(&mut self) -> usize {
        let anchors: Vec<Entity> = self
            .world
            .query_filtered::<Entity, With<Anchor>>()
            .iter(&self.world)
            .collect();
        let count = anchors.len();
        for anchor in anchors {
            self.despawn(anchor);
        }
        count
    }

    fn is_ancestor(&self, candidate: Entity, of: Entity) -> bool {
        let mut current = self.parent(of);
        while let Some(entity) = current {
            if entity == candidate {
                return true;
            }
            current = self.parent(entity);
        }
        false
    }

    // --- 变换 ---

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<Transform>(entity).copied()
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform) -> bool {
        match self.world.get_mut::<Transform>(entity) {
            Some(mut current) => {
                *current = transform;
                true
            }
            None => false,
        }
    }

    /// 以矩阵设置局部变换
    pub fn set_matrix(&mut self, entity: Entity, matrix: Mat4) -> bool {
        self.set_transform(entity, Transform::from_matrix(matrix))
    }

    /// 在父空间中平移
    pub fn translate_by(&mut self, entity: Entity, delta: Vec3) -> bool {
        match self.world.get_mut::<Transform>(entity) {
            Some(mut transform) => {
                transform.pos += delta;
                true
            }
            None => false,
        }
    }

    pub fn set_uniform_scale(&mut self, entity: Entity, scale: f32) -> bool {
        match self.world.get_mut::<Transform>(entity) {
            Some(mut transform) => {
                transform.scale = Vec3::splat(scale);
                true
            }
            None => false,
        }
    }

    /// 沿父链组合出的世界矩阵
    pub fn world_matrix(&self, entity: Entity) -> Option<Mat4> {
        let mut matrix = self.transform(entity)?.compute_matrix();
        let mut current = self.parent(entity);
        while let Some(parent) = current {
            let parent_transform = self.transform(parent)?;
            matrix = parent_transform.compute_matrix() * matrix;
            current = self.parent(parent);
        }
        Some(matrix)
    }

    /// `entity` 相对 `reference` 的变换：`world(reference)^-1 * world(entity)`
    pub fn transform_relative_to(&self, entity: Entity, reference: Entity) -> Option<Mat4> {
        let entity_world = self.world_matrix(entity)?;
        let reference_world = self.world_matrix(reference)?;
        Some(reference_world.inverse() * entity_world)
    }

    // --- 可视属性 ---

    pub fn insert_mesh(&mut self, entity: Entity, mesh: SphereMesh) -> bool {
        match self.world.get_entity_mut(entity) {
            Some(mut e) => {
                e.insert(mesh);
                true
            }
            None => false,
        }
    }

    pub fn mesh(&self, entity: Entity) -> Option<SphereMesh> {
        self.world.get::<SphereMesh>(entity).copied()
    }

    pub fn set_material(&mut self, entity: Entity, material: Material) -> bool {
        match self.world.get_entity_mut(entity) {
            Some(mut e) => {
                e.insert(material);
                true
            }
            None => false,
        }
    }

    pub fn material(&self, entity: Entity) -> Option<Material> {
        self.world.get::<Material>(entity).copied()
    }

    /// 仅修改材质透明度
    pub fn set_opacity(&mut self, entity: Entity, alpha: f32) -> bool {
        match self.world.get_mut::<Material>(entity) {
            Some(mut material) => {
                material.color.w = alpha;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec4};

    #[test]
    fn test_attach_and_detach() {
        let mut scene = SceneGraph::new();
        let parent = scene.spawn(Transform::default());
        let child = scene.spawn(Transform::default());

        assert!(scene.attach(child, parent));
        assert_eq!(scene.parent(child), Some(parent));
        assert_eq!(scene.children(parent), &[child]);

        assert!(scene.detach(child));
        assert_eq!(scene.parent(child), None);
        assert!(scene.children(parent).is_empty());
        assert!(scene.contains(child));

        // 已卸载的节点再次卸载是无操作
        assert!(!scene.detach(child));
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut scene = SceneGraph::new();
        let a = scene.spawn(Transform::default());
        let b = scene.spawn(Transform::default());
        let child = scene.spawn(Transform::default());

        scene.attach(child, a);
        scene.attach(child, b);

        assert!(scene.children(a).is_empty());
        assert_eq!(scene.children(b), &[child]);
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn(Transform::default());
        let leaf = scene.spawn(Transform::default());
        scene.attach(leaf, root);

        assert!(!scene.attach(root, leaf));
        assert!(!scene.attach(root, root));
    }

    #[test]
    fn test_despawn_is_recursive() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn(Transform::default());
        let mid = scene.spawn(Transform::default());
        let leaf = scene.spawn(Transform::default());
        scene.attach(mid, root);
        scene.attach(leaf, mid);

        assert!(scene.despawn(mid));
        assert!(!scene.contains(mid));
        assert!(!scene.contains(leaf));
        assert!(scene.children(root).is_empty());
        assert!(!scene.despawn(mid));
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut scene = SceneGraph::new();
        let camera = scene.spawn(Transform {
            pos: Vec3::new(0.0, 1.0, 0.0),
            rot: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            scale: Vec3::ONE,
        });
        let emitter = scene.spawn(Transform::from_translation(Vec3::new(0.0, 0.0, -0.5)));
        scene.attach(emitter, camera);

        let world = scene.world_matrix(emitter).unwrap();
        let origin = world.transform_point3(Vec3::ZERO);
        // 绕 Y 转 90° 后，-Z 方向变为 -X
        assert!(origin.abs_diff_eq(Vec3::new(-0.5, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_transform_relative_to() {
        let mut scene = SceneGraph::new();
        let world_origin = scene.spawn_anchor(Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        let node = scene.spawn(Transform::from_translation(Vec3::new(3.0, 2.0, 0.0)));

        let relative = scene.transform_relative_to(node, world_origin).unwrap();
        let pos = relative.transform_point3(Vec3::ZERO);
        assert!(pos.abs_diff_eq(Vec3::new(2.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn test_remove_anchors() {
        let mut scene = SceneGraph::new();
        let anchor = scene.spawn_anchor(Transform::default());
        let child = scene.spawn(Transform::default());
        let loose = scene.spawn(Transform::default());
        scene.attach(child, anchor);

        assert_eq!(scene.remove_anchors(), 1);
        assert!(!scene.contains(anchor));
        assert!(!scene.contains(child));
        assert!(scene.contains(loose));
    }

    #[test]
    fn test_visual_properties() {
        let mut scene = SceneGraph::new();
        let node = scene.spawn(Transform::default());

        assert!(scene.material(node).is_none());
        assert!(!scene.set_opacity(node, 0.5));

        scene.insert_mesh(node, SphereMesh { radius: 0.05 });
        scene.set_material(node, Material::simple(Material::RED));
        scene.set_opacity(node, 0.5);
        scene.set_uniform_scale(node, 0.25);

        assert_eq!(scene.mesh(node), Some(SphereMesh { radius: 0.05 }));
        assert_eq!(
            scene.material(node).unwrap().color,
            Vec4::new(1.0, 0.0, 0.0, 0.5)
        );
        assert_eq!(scene.transform(node).unwrap().scale, Vec3::splat(0.25));
    }

    #[test]
    fn test_missing_entity_is_noop() {
        let mut scene = SceneGraph::new();
        let node = scene.spawn(Transform::default());
        scene.despawn(node);

        assert!(!scene.translate_by(node, Vec3::X));
        assert!(!scene.set_material(node, Material::default()));
        assert!(scene.world_matrix(node).is_none());
        assert_eq!(scene.entity_count(), 0);
    }
}
