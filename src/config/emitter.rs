use super::{validate_capacity, validate_positive, ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 物理粒子寿命上限（秒）
pub const MAX_PHYSICS_LIFESPAN_SECS: f64 = 3600.0;

/// 运动学（Nature of Code）发射器配置
///
/// 寿命与加速度均以帧为单位：每次 `update` 年龄加 1，速度加一次加速度。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicConfig {
    /// 粒子池容量
    pub count: usize,

    /// 粒子球体半径（米）
    pub radius: f32,

    /// 最大加速度（取绝对值，沿 -Z）
    pub max_acceleration: f32,

    /// 最大寿命（帧）
    pub max_lifespan: f32,
}

impl_default!(KinematicConfig {
    count: 100,
    radius: 0.05,
    max_acceleration: 0.0002,
    max_lifespan: 100.0,
});

impl KinematicConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        validate_capacity("kinematic.count", self.count)?;
        validate_positive("kinematic.radius", self.radius)?;
        validate_positive("kinematic.max_lifespan", self.max_lifespan)?;
        if !self.max_acceleration.is_finite() || self.max_acceleration == 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "kinematic.max_acceleration must be finite and non-zero, got {}",
                self.max_acceleration
            )));
        }
        Ok(())
    }
}

/// 物理发射器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsEmitterConfig {
    /// 粒子池容量
    pub count: usize,

    /// 粒子球体半径（米）
    pub radius: f32,

    /// 粒子质量（千克）
    pub mass: f32,

    /// 最大冲量大小（取绝对值，沿发射器 -Z）
    pub max_impulse_magnitude: f32,

    /// 冲量的固定向上分量
    pub upward_impulse: f32,

    /// 最大寿命（秒，墙钟时间）
    pub max_lifespan_secs: f64,
}

impl_default!(PhysicsEmitterConfig {
    count: 200,
    radius: 0.1,
    mass: 1.0,
    max_impulse_magnitude: 10.0,
    upward_impulse: 2.5,
    max_lifespan_secs: 3.0,
});

impl PhysicsEmitterConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        validate_capacity("physics.count", self.count)?;
        validate_positive("physics.radius", self.radius)?;
        validate_positive("physics.mass", self.mass)?;
        if !self.max_lifespan_secs.is_finite()
            || self.max_lifespan_secs <= 0.0
            || self.max_lifespan_secs > MAX_PHYSICS_LIFESPAN_SECS
        {
            return Err(ConfigError::ValidationError(format!(
                "physics.max_lifespan_secs must be within (0, {MAX_PHYSICS_LIFESPAN_SECS}], got {}",
                self.max_lifespan_secs
            )));
        }
        if !self.max_impulse_magnitude.is_finite() || !self.upward_impulse.is_finite() {
            return Err(ConfigError::ValidationError(
                "physics impulse components must be finite".to_string(),
            ));
        }
        if self.max_impulse_magnitude == 0.0 {
            return Err(ConfigError::ValidationError(
                "physics.max_impulse_magnitude must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// 环境配置：重力与代替场景重建网格的静态地面
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// 重力加速度
    pub gravity: [f32; 3],

    /// 静态地面高度（None 表示没有环境几何体）
    pub floor_height: Option<f32>,
}

impl_default!(EnvironmentConfig {
    gravity: [0.0, -9.81, 0.0],
    floor_height: Some(-1.5),
});

impl EnvironmentConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(ConfigError::ValidationError(
                "environment.gravity must be finite".to_string(),
            ));
        }
        if self.floor_height.is_some_and(|h| !h.is_finite()) {
            return Err(ConfigError::ValidationError(
                "environment.floor_height must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// 无头帧循环配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLoopConfig {
    /// 目标帧率
    pub target_fps: u32,

    /// 运行的帧数
    pub frames: u64,

    /// 每隔多少帧自动切换一次模式（0 表示不切换）
    pub toggle_every_frames: u64,
}

impl_default!(EngineLoopConfig {
    target_fps: 60,
    frames: 600,
    toggle_every_frames: 300,
});

impl EngineLoopConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.target_fps == 0 || self.target_fps > 1000 {
            return Err(ConfigError::ValidationError(
                "Invalid target FPS".to_string(),
            ));
        }
        Ok(())
    }

    /// 固定时间步长（秒）
    pub fn fixed_time_step(&self) -> f64 {
        1.0 / f64::from(self.target_fps)
    }
}
