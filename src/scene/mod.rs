//! 场景管理
//!
//! 宿主场景图：节点层级、变换与可视属性。
//! 粒子发射器只通过这里的挂载/卸载、变换与材质接口和宿主交互。

pub mod graph;

pub use graph::SceneGraph;
