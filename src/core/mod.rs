//! 核心模块
//!
//! 包含模拟的核心功能：
//! - `controller` - 发射器切换与逐帧驱动
//! - `engine` - 无头帧循环和日志初始化
//! - `error` - 错误类型定义

pub mod controller;
pub mod engine;
pub mod error;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{
    PhysicsError, PhysicsResult, SceneError, SceneResult, SimulationError, SimulationResult,
};

// 重新导出主要类型
pub use controller::{ActiveEmitter, EmitterKind, SimulationController, UiSignal};
pub use engine::{Engine, RunReport};
