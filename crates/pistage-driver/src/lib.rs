//! 驱动层模块
//!
//! 本模块定义 PI 线性位移台驱动需要提供的能力，包括：
//! - 驱动能力接口 [`StageDriver`]（连接、运动、查询）
//! - 驱动层错误类型 [`DriverError`]
//! - 诊断消息单槽捕获 [`DiagnosticSink`] / [`DiagnosticLayer`]
//! - 无硬件时使用的模拟位移台 [`SimulatedStage`]
//!
//! # 使用场景
//!
//! 大多数用户应该使用 `pistage-client` 提供的 `DelayStage` facade，
//! 它在本层之上维护状态机并提供多单位视图。

pub mod diagnostics;
pub mod driver;
mod error;
pub mod simulated;

pub use diagnostics::{DIAGNOSTICS_TARGET, DiagnosticLayer, DiagnosticSink};
pub use driver::{StageDriver, TravelRange};
pub use error::DriverError;
pub use simulated::{ControllerErrorCode, HISTORY_CAPACITY, SimulatedStage, SimulationConfig};
