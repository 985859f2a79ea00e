/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量覆盖和启动时校验
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod emitter;

pub use emitter::{EngineLoopConfig, EnvironmentConfig, KinematicConfig, PhysicsEmitterConfig};

use crate::impl_default;

/// 池容量上限，保证一次重建在帧预算内完成
pub const MAX_CAPACITY: usize = 4096;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 模拟主配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 启动时是否使用物理发射器
    pub use_physics: bool,

    /// 会话重建后延迟多少秒再启动发射器
    pub startup_delay_secs: f32,

    /// 发射器相对相机锚点的位置
    pub emitter_offset: [f32; 3],

    /// 随机种子（None 表示使用系统熵）
    pub seed: Option<u64>,

    /// 运动学发射器
    pub kinematic: KinematicConfig,

    /// 物理发射器
    pub physics: PhysicsEmitterConfig,

    /// 环境（重力、地面）
    pub environment: EnvironmentConfig,

    /// 无头帧循环
    pub engine: EngineLoopConfig,

    /// 日志配置
    pub logging: LoggingConfig,
}

impl_default!(SimulationConfig {
    use_physics: false,
    startup_delay_secs: 1.0,
    emitter_offset: [0.0, 0.0, -0.5],
    seed: None,
    kinematic: KinematicConfig::default(),
    physics: PhysicsEmitterConfig::default(),
    environment: EnvironmentConfig::default(),
    engine: EngineLoopConfig::default(),
    logging: LoggingConfig::default(),
});

impl SimulationConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 按扩展名加载（.json 走 JSON，其余走 TOML）
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("PARTICLES_USE_PHYSICS") {
            self.use_physics = val.parse().unwrap_or(self.use_physics);
        }
        if let Ok(val) = env::var("PARTICLES_SEED") {
            if let Ok(seed) = val.parse() {
                self.seed = Some(seed);
            }
        }
        if let Ok(val) = env::var("PARTICLES_STARTUP_DELAY") {
            if let Ok(delay) = val.parse() {
                self.startup_delay_secs = delay;
            }
        }

        // 发射器容量
        if let Ok(val) = env::var("PARTICLES_KINEMATIC_COUNT") {
            if let Ok(count) = val.parse() {
                self.kinematic.count = count;
            }
        }
        if let Ok(val) = env::var("PARTICLES_PHYSICS_COUNT") {
            if let Ok(count) = val.parse() {
                self.physics.count = count;
            }
        }

        // 帧循环
        if let Ok(val) = env::var("PARTICLES_FRAMES") {
            if let Ok(frames) = val.parse() {
                self.engine.frames = frames;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.startup_delay_secs.is_finite() || self.startup_delay_secs < 0.0 {
            return Err(ConfigError::ValidationError(
                "startup_delay_secs must be a non-negative number".to_string(),
            ));
        }
        if self.emitter_offset.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::ValidationError(
                "emitter_offset must be finite".to_string(),
            ));
        }
        self.kinematic.validate()?;
        self.physics.validate()?;
        self.environment.validate()?;
        self.engine.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./particles.toml
    /// 2. ./particles.json
    /// 3. ~/.config/ar_particles/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("particles.toml") {
            tracing::info!(target: "engine", "Loaded config from particles.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("particles.json") {
            tracing::info!(target: "engine", "Loaded config from particles.json");
            return config;
        }

        if let Some(home) = env::var_os("HOME") {
            let config_path = PathBuf::from(home)
                .join(".config")
                .join("ar_particles")
                .join("config.toml");

            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "engine", "Loaded config from {:?}", config_path);
                return config;
            }
        }

        tracing::info!(target: "engine", "Using default configuration");
        Self::default()
    }
}

/// 校验池容量
pub(crate) fn validate_capacity(name: &str, count: usize) -> ConfigResult<()> {
    if count == 0 || count > MAX_CAPACITY {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be within 1..={MAX_CAPACITY}, got {count}"
        )));
    }
    Ok(())
}

/// 校验正的有限数
pub(crate) fn validate_positive(name: &str, value: f32) -> ConfigResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be a positive number, got {value}"
        )));
    }
    Ok(())
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（`RUST_LOG` 优先）
    pub level: LogLevel,

    /// 是否输出 span 关闭事件（帧耗时）
    pub log_frame_spans: bool,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    log_frame_spans: false,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// 作为 `EnvFilter` 指令
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
