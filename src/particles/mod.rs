//! 粒子与发射器
//!
//! 两种可互换的发射器，各自拥有固定容量的粒子池：
//! - [`KinematicEmitter`]：逐帧解析积分加速度、速度和位置
//! - [`PhysicsEmitter`]：运动交给刚体物理，碰撞后改变颜色
//!
//! 粒子死亡后在同一个池位立即补上新粒子，池大小在 `start` 之后保持不变。

pub mod emitter;
pub mod particle;
pub mod physics_emitter;
pub mod physics_particle;

pub use emitter::KinematicEmitter;
pub use particle::Particle;
pub use physics_emitter::PhysicsEmitter;
pub use physics_particle::{PhysicsParticle, PhysicsParticleDesc};

use crate::ecs::Transform;
use crate::scene::SceneGraph;
use bevy_ecs::entity::Entity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 缓出正弦曲线，`x` 在 `[0, 1]` 内时输出也在 `[0, 1]` 内
pub fn ease_out_sine(x: f32) -> f32 {
    (x * std::f32::consts::FRAC_PI_2).sin()
}

/// 发射器统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterStats {
    /// 累计生成的粒子数
    pub spawned: u64,
    /// 累计回收（死亡后替换）的粒子数
    pub recycled: u64,
    /// 命中池内粒子的碰撞次数
    pub collisions: u64,
}

/// 新粒子的挂载位置
#[derive(Debug, Clone, Copy)]
pub(crate) struct Placement {
    pub parent: Entity,
    /// 相对 `parent` 的变换，缩放为 1
    pub transform: Transform,
    pub on_world_anchor: bool,
}

/// 世界锚点仍然存在时，以发射器当前相对锚点的变换快照挂到锚点下；
/// 否则挂在发射器自身原点。
pub(crate) fn placement(
    scene: &SceneGraph,
    emitter: Entity,
    world_anchor: Option<Entity>,
) -> Placement {
    let snapshot = world_anchor.and_then(|anchor| {
        scene
            .transform_relative_to(emitter, anchor)
            .map(|relative| (anchor, relative))
    });

    match snapshot {
        Some((anchor, relative)) => Placement {
            parent: anchor,
            transform: Transform::from_matrix(relative).with_uniform_scale(1.0),
            on_world_anchor: true,
        },
        None => Placement {
            parent: emitter,
            transform: Transform::default(),
            on_world_anchor: false,
        },
    }
}

pub(crate) fn emitter_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// `[max/2, max]` 内均匀取值（`max` 取绝对值）
pub(crate) fn upper_half(rng: &mut StdRng, max: f64) -> f64 {
    let max = max.abs();
    rng.gen_range(max * 0.5..=max)
}

/// `[-max, -max/2]` 内均匀取值（`max` 取绝对值）
pub(crate) fn negative_upper_half(rng: &mut StdRng, max: f64) -> f64 {
    -upper_half(rng, max)
}
