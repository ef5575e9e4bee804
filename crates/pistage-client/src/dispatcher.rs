//! 按名称分派的属性/命令接口
//!
//! 远程暴露层只认识字符串名称和少数几种值类型。[`CommandDispatcher`]
//! 把名称映射到 [`DelayStage`] 的方法：
//!
//! - `read(name)`：读取可读属性
//! - `write(name, value)`：写入读写属性，或触发 `cmd_*` 命令属性
//! - `execute(command, arg)`：执行命令
//!
//! # 示例
//!
//! ```rust
//! use std::sync::Arc;
//! use pistage_client::{AttributeValue, Command, CommandDispatcher, DelayStageBuilder};
//! use pistage_driver::{DiagnosticSink, SimulatedStage};
//!
//! let sink = DiagnosticSink::new();
//! let stage = DelayStageBuilder::new("117018374")
//!     .diagnostics(sink.clone())
//!     .build(SimulatedStage::with_defaults("117018374", sink));
//! let dispatcher = CommandDispatcher::new(Arc::new(stage));
//!
//! dispatcher.execute(Command::Connect, None).unwrap();
//! dispatcher.write("velocity_umps", AttributeValue::Double(2000.0)).unwrap();
//! assert_eq!(dispatcher.read("velocity").unwrap(), AttributeValue::Double(2.0));
//! ```

use crate::attributes::{AttributeDescriptor, DataType, attribute_table, find_attribute};
use crate::device::DelayStage;
use crate::error::StageError;
use pistage_driver::StageDriver;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// 属性值
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeValue {
    /// 浮点数
    Double(f64),
    /// 布尔值
    Boolean(bool),
    /// 字符串
    String(String),
}

impl AttributeValue {
    /// 值类型
    pub fn data_type(&self) -> DataType {
        match self {
            AttributeValue::Double(_) => DataType::Double,
            AttributeValue::Boolean(_) => DataType::Boolean,
            AttributeValue::String(_) => DataType::String,
        }
    }

    /// 按指定类型解析文本
    ///
    /// 布尔值接受 `true/false/1/0/on/off`。
    pub fn parse(data_type: DataType, text: &str) -> Option<Self> {
        let text = text.trim();
        match data_type {
            DataType::Double => text.parse().ok().map(AttributeValue::Double),
            DataType::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => Some(AttributeValue::Boolean(true)),
                "false" | "0" | "off" => Some(AttributeValue::Boolean(false)),
                _ => None,
            },
            DataType::String => Some(AttributeValue::String(text.to_string())),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Double(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Double(value) => write!(f, "{value}"),
            AttributeValue::Boolean(value) => write!(f, "{value}"),
            AttributeValue::String(value) => f.write_str(value),
        }
    }
}

/// 可执行命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// 连接控制器
    Connect,
    /// 断开连接
    Disconnect,
    /// 绝对运动（mm）
    MoveAbsolute,
    /// 绝对运动（µm）
    MoveAbsoluteUm,
    /// 绝对运动（fs）
    MoveAbsoluteFs,
    /// 相对运动（mm）
    MoveRelative,
    /// 相对运动（µm）
    MoveRelativeUm,
    /// 按步进大小走一步（参数为方向）
    MoveStep,
    /// 设置零点
    SetZeroPosition,
    /// 回零
    ZeroReferenceMove,
    /// 停止运动
    StopMotion,
}

impl Command {
    /// 全部命令
    pub const ALL: [Command; 11] = [
        Command::Connect,
        Command::Disconnect,
        Command::MoveAbsolute,
        Command::MoveAbsoluteUm,
        Command::MoveAbsoluteFs,
        Command::MoveRelative,
        Command::MoveRelativeUm,
        Command::MoveStep,
        Command::SetZeroPosition,
        Command::ZeroReferenceMove,
        Command::StopMotion,
    ];

    /// 命令名
    pub fn name(self) -> &'static str {
        match self {
            Command::Connect => "connect",
            Command::Disconnect => "disconnect",
            Command::MoveAbsolute => "move_absolute",
            Command::MoveAbsoluteUm => "move_absolute_um",
            Command::MoveAbsoluteFs => "move_absolute_fs",
            Command::MoveRelative => "move_relative",
            Command::MoveRelativeUm => "move_relative_um",
            Command::MoveStep => "move_step",
            Command::SetZeroPosition => "set_zero_position",
            Command::ZeroReferenceMove => "zero_reference_move",
            Command::StopMotion => "stop_motion",
        }
    }

    /// 参数单位（无参数命令返回 None）
    pub fn argument_unit(self) -> Option<&'static str> {
        match self {
            Command::MoveAbsolute | Command::MoveRelative => Some("mm"),
            Command::MoveAbsoluteUm | Command::MoveRelativeUm => Some("um"),
            Command::MoveAbsoluteFs => Some("fs"),
            Command::MoveStep => Some("direction"),
            _ => None,
        }
    }

    /// 是否需要一个浮点参数
    pub fn requires_argument(self) -> bool {
        self.argument_unit().is_some()
    }

    /// 从 `cmd_*` 触发属性名解析
    pub fn from_trigger(attribute: &str) -> Option<Self> {
        attribute.strip_prefix("cmd_")?.parse().ok()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|command| command.name() == s)
            .ok_or_else(|| StageError::UnknownCommand(s.to_string()))
    }
}

/// 属性/命令分派器
pub struct CommandDispatcher<D: StageDriver> {
    stage: Arc<DelayStage<D>>,
    table: Vec<AttributeDescriptor>,
}

impl<D: StageDriver> CommandDispatcher<D> {
    /// 创建分派器（属性表按 facade 的行程范围生成）
    pub fn new(stage: Arc<DelayStage<D>>) -> Self {
        let table = attribute_table(&stage.travel_range());
        Self { stage, table }
    }

    /// 属性表
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.table
    }

    /// 底层 facade
    pub fn stage(&self) -> &Arc<DelayStage<D>> {
        &self.stage
    }

    fn descriptor(&self, name: &str) -> Result<&AttributeDescriptor, StageError> {
        find_attribute(&self.table, name).ok_or_else(|| StageError::UnknownAttribute(name.to_string()))
    }

    /// 读取属性
    pub fn read(&self, name: &str) -> Result<AttributeValue, StageError> {
        let descriptor = self.descriptor(name)?;
        if !descriptor.access.is_readable() {
            return Err(StageError::NotReadable(name.to_string()));
        }

        let stage = &self.stage;
        let value = match descriptor.name {
            "position" => AttributeValue::Double(stage.position()?),
            "position_um" => AttributeValue::Double(stage.position_um()?),
            "position_fs" => AttributeValue::Double(stage.position_fs()?),
            "position_unshifted_um" => AttributeValue::Double(stage.position_unshifted_um()?),
            "position_min" => AttributeValue::Double(stage.position_min()),
            "position_max" => AttributeValue::Double(stage.position_max()),
            "position_min_um" => AttributeValue::Double(stage.position_min_um()),
            "position_max_um" => AttributeValue::Double(stage.position_max_um()),
            "position_min_fs" => AttributeValue::Double(stage.position_min_fs()),
            "position_max_fs" => AttributeValue::Double(stage.position_max_fs()),
            "on_target_state" => AttributeValue::Boolean(stage.on_target_state()?),
            "last_error" => AttributeValue::String(stage.last_error()),
            "server_message" => AttributeValue::String(stage.server_message()),
            "controller_serial" => AttributeValue::String(stage.controller_serial().to_string()),
            "state" => AttributeValue::String(stage.state().to_string()),
            "velocity" => AttributeValue::Double(stage.velocity()?),
            "velocity_umps" => AttributeValue::Double(stage.velocity_umps()?),
            "move_step_size_um" => AttributeValue::Double(stage.move_step_size_um()),
            _ => return Err(StageError::NotReadable(name.to_string())),
        };
        Ok(value)
    }

    /// 写入属性
    ///
    /// `cmd_*` 属性写入即执行对应命令；无参数命令忽略写入值。
    pub fn write(&self, name: &str, value: AttributeValue) -> Result<(), StageError> {
        let descriptor = self.descriptor(name)?;
        if !descriptor.access.is_writable() {
            return Err(StageError::NotWritable(name.to_string()));
        }

        if let Some(command) = Command::from_trigger(descriptor.name) {
            let argument = if command.requires_argument() {
                Some(Self::expect_double(descriptor, &value)?)
            } else {
                None
            };
            return self.execute(command, argument);
        }

        let number = Self::expect_double(descriptor, &value)?;
        debug!(attribute = name, value = number, "Attribute write");
        match descriptor.name {
            "velocity" => self.stage.set_velocity(number),
            "velocity_umps" => self.stage.set_velocity_umps(number),
            "move_step_size_um" => {
                self.stage.set_move_step_size_um(number);
                Ok(())
            },
            _ => Err(StageError::NotWritable(name.to_string())),
        }
    }

    /// 执行命令
    ///
    /// # 错误
    ///
    /// - 需要参数却未提供：[`StageError::MissingArgument`]
    /// - 状态机拒绝：[`StageError::InvalidTransition`]
    pub fn execute(&self, command: Command, argument: Option<f64>) -> Result<(), StageError> {
        let argument = match (command.requires_argument(), argument) {
            (true, Some(value)) => value,
            (true, None) => return Err(StageError::MissingArgument(command.name().to_string())),
            (false, _) => 0.0,
        };
        debug!(%command, argument, "Execute command");

        let stage = &self.stage;
        match command {
            Command::Connect => stage.connect().map(|_| ()),
            Command::Disconnect => stage.disconnect(),
            Command::MoveAbsolute => stage.move_absolute(argument),
            Command::MoveAbsoluteUm => stage.move_absolute_um(argument),
            Command::MoveAbsoluteFs => stage.move_absolute_fs(argument),
            Command::MoveRelative => stage.move_relative(argument),
            Command::MoveRelativeUm => stage.move_relative_um(argument),
            Command::MoveStep => stage.move_step(argument),
            Command::SetZeroPosition => stage.set_zero_position(),
            Command::ZeroReferenceMove => stage.zero_reference_move(),
            Command::StopMotion => stage.stop_motion(),
        }
    }

    fn expect_double(
        descriptor: &AttributeDescriptor,
        value: &AttributeValue,
    ) -> Result<f64, StageError> {
        value.as_f64().ok_or_else(|| StageError::TypeMismatch {
            name: descriptor.name.to_string(),
            expected: descriptor.data_type,
        })
    }
}
