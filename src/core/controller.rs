//! 模拟控制器
//!
//! 同一时刻只存在一个发射器。切换模式时先停止并销毁当前发射器、重建 AR 会话，
//! 经过启动延迟后再创建另一种发射器。
//!
//! UI 信号可以从任意线程发送，只在 `tick` 开始时于模拟线程上取出处理。

use crate::config::SimulationConfig;
use crate::core::error::{SceneError, SimulationResult};
use crate::particles::{EmitterStats, KinematicEmitter, PhysicsEmitter};
use crate::physics::PhysicsWorld;
use crate::scene::SceneGraph;
use crate::xr::{ArSession, Pose};
use bevy_ecs::entity::Entity;
use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::Vec3;

/// UI 信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiSignal {
    SetUsePhysics(bool),
    TogglePhysics,
    /// 已接线但不处理
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterKind {
    Kinematic,
    Physics,
}

impl EmitterKind {
    pub fn from_use_physics(use_physics: bool) -> Self {
        if use_physics {
            EmitterKind::Physics
        } else {
            EmitterKind::Kinematic
        }
    }
}

/// 当前活动的发射器
pub enum ActiveEmitter {
    Kinematic(KinematicEmitter),
    Physics(PhysicsEmitter),
}

impl ActiveEmitter {
    pub fn kind(&self) -> EmitterKind {
        match self {
            ActiveEmitter::Kinematic(_) => EmitterKind::Kinematic,
            ActiveEmitter::Physics(_) => EmitterKind::Physics,
        }
    }

    pub fn entity(&self) -> Entity {
        match self {
            ActiveEmitter::Kinematic(emitter) => emitter.entity(),
            ActiveEmitter::Physics(emitter) => emitter.entity(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ActiveEmitter::Kinematic(emitter) => emitter.len(),
            ActiveEmitter::Physics(emitter) => emitter.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> EmitterStats {
        match self {
            ActiveEmitter::Kinematic(emitter) => emitter.stats(),
            ActiveEmitter::Physics(emitter) => emitter.stats(),
        }
    }

    fn update(&mut self, scene: &mut SceneGraph, physics: &mut PhysicsWorld) {
        match self {
            ActiveEmitter::Kinematic(emitter) => emitter.update(scene),
            ActiveEmitter::Physics(emitter) => emitter.update(scene, physics),
        }
    }

    fn teardown(self, scene: &mut SceneGraph, physics: &mut PhysicsWorld) {
        match self {
            ActiveEmitter::Kinematic(emitter) => emitter.teardown(scene),
            ActiveEmitter::Physics(emitter) => emitter.teardown(scene, physics),
        }
    }
}

/// 等待启动的发射器
#[derive(Debug, Clone, Copy)]
struct PendingStart {
    kind: EmitterKind,
    remaining_secs: f32,
}

pub struct SimulationController {
    config: SimulationConfig,
    scene: SceneGraph,
    physics: PhysicsWorld,
    session: ArSession,
    use_physics: bool,
    active: Option<ActiveEmitter>,
    pending: Option<PendingStart>,
    signal_tx: Sender<UiSignal>,
    signal_rx: Receiver<UiSignal>,
    frame: u64,
}

impl SimulationController {
    /// 校验配置，搭建物理世界与 AR 会话，并安排初始发射器
    pub fn new(config: SimulationConfig) -> SimulationResult<Self> {
        config.validate()?;

        let mut physics = PhysicsWorld::with_gravity(Vec3::from(config.environment.gravity))?;
        if let Some(height) = config.environment.floor_height {
            physics.add_static_floor(height);
        }

        let mut scene = SceneGraph::new();
        let mut session = ArSession::new();
        session.reset(&mut scene);

        let (signal_tx, signal_rx) = unbounded();
        let use_physics = config.use_physics;
        let pending = Some(PendingStart {
            kind: EmitterKind::from_use_physics(use_physics),
            remaining_secs: config.startup_delay_secs,
        });

        tracing::info!(
            target: "engine",
            use_physics,
            startup_delay_secs = config.startup_delay_secs,
            "simulation controller ready"
        );

        Ok(Self {
            config,
            scene,
            physics,
            session,
            use_physics,
            active: None,
            pending,
            signal_tx,
            signal_rx,
            frame: 0,
        })
    }

    /// UI 信号发送端（可跨线程克隆）
    pub fn signals(&self) -> Sender<UiSignal> {
        self.signal_tx.clone()
    }

    /// 推进一帧：处理信号 → 启动待定发射器 → 物理步进 → 同步变换 → 更新发射器
    pub fn tick(&mut self, dt: f32) -> SimulationResult<()> {
        self.frame += 1;
        let _span = tracing::info_span!(target: "engine", "tick", frame = self.frame).entered();

        self.drain_signals();
        self.advance_pending(dt)?;

        self.physics.step(dt);
        self.physics.sync_transforms(&mut self.scene);

        if let Some(active) = self.active.as_mut() {
            active.update(&mut self.scene, &mut self.physics);
        }
        Ok(())
    }

    fn drain_signals(&mut self) {
        while let Ok(signal) = self.signal_rx.try_recv() {
            match signal {
                UiSignal::SetUsePhysics(value) => self.set_use_physics(value),
                UiSignal::TogglePhysics => self.set_use_physics(!self.use_physics),
                UiSignal::Reset => {
                    tracing::debug!(target: "engine", "reset signal received, ignored");
                }
            }
        }
    }

    /// 切换模式：立即停止并销毁当前发射器，重建会话，延迟启动另一种
    pub fn set_use_physics(&mut self, use_physics: bool) {
        if use_physics == self.use_physics {
            return;
        }
        self.use_physics = use_physics;

        if let Some(active) = self.active.take() {
            tracing::info!(target: "engine", kind = ?active.kind(), "stopping active emitter");
            active.teardown(&mut self.scene, &mut self.physics);
        }
        self.session.reset(&mut self.scene);
        self.pending = Some(PendingStart {
            kind: EmitterKind::from_use_physics(use_physics),
            remaining_secs: self.config.startup_delay_secs,
        });
    }

    fn advance_pending(&mut self, dt: f32) -> SimulationResult<()> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };
        pending.remaining_secs -= dt;
        if pending.remaining_secs > 0.0 {
            return Ok(());
        }

        let kind = pending.kind;
        self.pending = None;
        self.start_emitter(kind)
    }

    fn start_emitter(&mut self, kind: EmitterKind) -> SimulationResult<()> {
        let pov = self
            .session
            .pov()
            .ok_or(SceneError::AnchorMissing("point of view"))?;
        let world_origin = self.session.world_origin();
        let offset = Vec3::from(self.config.emitter_offset);

        let active = match kind {
            EmitterKind::Kinematic => {
                let mut emitter = KinematicEmitter::new(
                    &mut self.scene,
                    pov,
                    offset,
                    world_origin,
                    self.config.kinematic.clone(),
                    self.config.seed,
                )?;
                emitter.start(&mut self.scene);
                ActiveEmitter::Kinematic(emitter)
            }
            EmitterKind::Physics => {
                let mut emitter = PhysicsEmitter::new(
                    &mut self.scene,
                    pov,
                    offset,
                    world_origin,
                    self.config.physics.clone(),
                    self.config.seed,
                )?;
                emitter.start(&mut self.scene, &mut self.physics);
                ActiveEmitter::Physics(emitter)
            }
        };

        tracing::info!(target: "engine", ?kind, frame = self.frame, "emitter started");
        self.active = Some(active);
        Ok(())
    }

    /// 相机跟踪
    pub fn set_camera_pose(&mut self, pose: Pose) {
        self.session.set_camera_pose(&mut self.scene, pose);
    }

    pub fn use_physics(&self) -> bool {
        self.use_physics
    }

    pub fn active(&self) -> Option<&ActiveEmitter> {
        self.active.as_ref()
    }

    pub fn active_kind(&self) -> Option<EmitterKind> {
        self.active.as_ref().map(ActiveEmitter::kind)
    }

    /// 是否有发射器等待启动
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn session(&self) -> &ArSession {
        &self.session
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn config(use_physics: bool, delay: f32) -> SimulationConfig {
        let mut config = SimulationConfig {
            use_physics,
            startup_delay_secs: delay,
            seed: Some(17),
            ..Default::default()
        };
        config.kinematic.count = 8;
        config.physics.count = 8;
        config
    }

    #[test]
    fn test_initial_emitter_waits_for_delay() {
        let mut controller = SimulationController::new(config(false, 0.05)).unwrap();
        assert!(controller.is_pending());

        controller.tick(DT).unwrap();
        controller.tick(DT).unwrap();
        assert!(controller.active_kind().is_none());

        controller.tick(DT).unwrap();
        controller.tick(DT).unwrap();
        assert_eq!(controller.active_kind(), Some(EmitterKind::Kinematic));
        assert_eq!(controller.active().unwrap().len(), 8);
    }

    #[test]
    fn test_zero_delay_starts_on_next_tick() {
        let mut controller = SimulationController::new(config(true, 0.0)).unwrap();
        controller.tick(DT).unwrap();

        assert_eq!(controller.active_kind(), Some(EmitterKind::Physics));
        assert_eq!(controller.physics().body_count(), 8);
    }

    #[test]
    fn test_emitter_hangs_off_camera_anchor() {
        let mut controller = SimulationController::new(config(false, 0.0)).unwrap();
        controller.tick(DT).unwrap();

        let emitter = controller.active().unwrap().entity();
        let pov = controller.session().pov().unwrap();
        assert_eq!(controller.scene().parent(emitter), Some(pov));
        assert_eq!(
            controller.scene().transform(emitter).unwrap().pos,
            Vec3::new(0.0, 0.0, -0.5)
        );
    }

    #[test]
    fn test_toggle_swaps_emitters() {
        let mut controller = SimulationController::new(config(false, 0.0)).unwrap();
        controller.tick(DT).unwrap();
        let old_emitter = controller.active().unwrap().entity();

        controller.signals().send(UiSignal::TogglePhysics).unwrap();
        controller.tick(DT).unwrap();

        assert!(controller.use_physics());
        assert_eq!(controller.active_kind(), Some(EmitterKind::Physics));
        assert!(!controller.scene().contains(old_emitter));
    }

    #[test]
    fn test_same_mode_is_noop() {
        let mut controller = SimulationController::new(config(false, 0.0)).unwrap();
        controller.tick(DT).unwrap();
        let emitter = controller.active().unwrap().entity();

        controller.set_use_physics(false);
        assert!(!controller.is_pending());
        assert_eq!(controller.active().unwrap().entity(), emitter);
        assert_eq!(controller.session().resets(), 1);
    }

    #[test]
    fn test_reset_signal_is_ignored() {
        let mut controller = SimulationController::new(config(false, 0.0)).unwrap();
        controller.tick(DT).unwrap();
        let emitter = controller.active().unwrap().entity();

        controller.signals().send(UiSignal::Reset).unwrap();
        controller.tick(DT).unwrap();

        assert_eq!(controller.active().unwrap().entity(), emitter);
        assert_eq!(controller.session().resets(), 1);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut bad = config(false, 0.0);
        bad.kinematic.count = 0;
        assert!(SimulationController::new(bad).is_err());
    }

    #[test]
    fn test_camera_pose_moves_emitter() {
        let mut controller = SimulationController::new(config(false, 0.0)).unwrap();
        controller.set_camera_pose(Pose::new(Vec3::new(0.0, 1.5, 0.0), glam::Quat::IDENTITY));
        controller.tick(DT).unwrap();

        let emitter = controller.active().unwrap().entity();
        let world = controller.scene().world_matrix(emitter).unwrap();
        assert!(world
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(0.0, 1.5, -0.5), 1e-5));
    }
}
