//! 客户端错误类型

use crate::attributes::DataType;
use crate::state::{DeviceState, StateEvent};
use pistage_driver::DriverError;
use thiserror::Error;

/// 位移台 facade 错误
///
/// 分两类：
/// - **拒绝**（[`is_rejection`](Self::is_rejection) 为 true）：调用方请求不合法，
///   驱动未被调用，设备状态未改变
/// - **驱动错误**：读取类操作从驱动得到的失败
#[derive(Debug, Error)]
pub enum StageError {
    /// 当前状态不允许该事件
    #[error("Invalid state transition: {event} not allowed in state {from}")]
    InvalidTransition {
        /// 事件发生时的状态
        from: DeviceState,
        /// 被拒绝的事件
        event: StateEvent,
    },

    /// 驱动调用失败
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 未知属性名
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// 未知命令名
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// 属性只读
    #[error("Attribute {0} is not writable")]
    NotWritable(String),

    /// 属性只写（命令触发属性）
    #[error("Attribute {0} is not readable")]
    NotReadable(String),

    /// 写入值类型不匹配
    #[error("Type mismatch for {name}: expected {expected}")]
    TypeMismatch {
        /// 属性名
        name: String,
        /// 期望的类型
        expected: DataType,
    },

    /// 命令缺少参数
    #[error("Command {0} requires an argument")]
    MissingArgument(String),
}

impl StageError {
    /// 是否为调用方错误（设备未被触碰）
    pub fn is_rejection(&self) -> bool {
        !matches!(self, StageError::Driver(_))
    }
}
