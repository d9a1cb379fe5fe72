//! # Giorgio Tools - 应用共享的数据结构
//!
//! **依赖原则**: 只依赖 `giorgio-protocol` 与 `giorgio-car`，不做任何总线 IO
//!
//! ## 包含模块
//!
//! - `scenario` - 场景文件（TOML，逐周期的输入信号与控制指令）
//! - `recording` - 帧日志（JSON Lines，逐周期的输出帧）

pub mod recording;
pub mod scenario;

// 重新导出常用类型
pub use recording::{FrameLog, LogMetadata, RecordedFrame};
pub use scenario::{Scenario, ScenarioStep};
