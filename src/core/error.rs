//! 统一错误处理模块
//!
//! 错误只出现在构造阶段：配置解析、参数校验、宿主场景初始化。
//! 粒子的 `start` / `update` / `stop` 以及碰撞处理都是全函数，不返回错误。
//!
//! `SimulationError` 汇总各层错误，启动失败时由二进制入口打印并退出。

use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};

/// 模拟核心错误类型
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 宿主场景错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("Anchor missing: {0}")]
    AnchorMissing(&'static str),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),
}

/// 物理系统错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("Invalid physics configuration: {0}")]
    InvalidConfig(String),
}

/// 模拟结果类型别名
pub type SimulationResult<T> = Result<T, SimulationError>;
pub type SceneResult<T> = Result<T, SceneError>;
pub type PhysicsResult<T> = Result<T, PhysicsError>;
