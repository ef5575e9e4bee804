//! 设备状态
//!
//! 见 [`machine`] 模块的转换表。

pub mod machine;

pub use machine::{AtomicDeviceState, DeviceState, StateEvent, StateMachine, Transition, next_state};
