//! 客户端接口模块
//!
//! 本模块提供 PI 线性延迟台的 facade，包括：
//! - 设备生命周期状态机（Disconnected / Initializing / Ready / Moving / Faulted）
//! - 强类型单位（Millimeter、Micrometer、Femtosecond）及换算
//! - 按名称分派的属性/命令接口，供远程暴露层或本地 shell 使用
//!
//! # 使用场景
//!
//! ```rust
//! use pistage_client::{DelayStageBuilder, DeviceState};
//! use pistage_driver::{DiagnosticSink, SimulatedStage};
//!
//! let sink = DiagnosticSink::new();
//! let driver = SimulatedStage::with_defaults("117018374", sink.clone());
//! let stage = DelayStageBuilder::new("117018374").diagnostics(sink).build(driver.clone());
//!
//! assert_eq!(stage.connect().unwrap(), DeviceState::Ready);
//! stage.move_absolute(10.0).unwrap();
//! assert_eq!(stage.state(), DeviceState::Moving);
//!
//! driver.finish_motion();
//! assert!(stage.on_target_state().unwrap()); // 有副作用：Moving → Ready
//! assert_eq!(stage.state(), DeviceState::Ready);
//! ```

pub mod attributes;
pub mod builder;
pub mod device;
pub mod dispatcher;
mod error;
pub mod state;
pub mod units;

// 重新导出常用类型
pub use attributes::{Access, AttributeDescriptor, DataType, DisplayLevel, attribute_table};
pub use builder::DelayStageBuilder;
pub use device::DelayStage;
pub use dispatcher::{AttributeValue, Command, CommandDispatcher};
pub use error::StageError;
pub use state::{DeviceState, StateEvent};
pub use units::{Femtosecond, Micrometer, MicrometerPerSecond, Millimeter, MillimeterPerSecond};
