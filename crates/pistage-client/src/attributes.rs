//! 属性元数据
//!
//! 对外暴露的属性表：名称、单位、访问方式、显示级别和取值范围。
//! 远程暴露层（或本地 shell）按此表注册属性，读写由
//! [`CommandDispatcher`](crate::dispatcher::CommandDispatcher) 分派到 facade。
//!
//! 位置类属性的 min/max 由行程范围经 [`units`](crate::units) 换算得到，
//! 与实时读数使用同一组函数。
//!
//! `cmd_*` 属性是命令的写触发形式：写入即执行对应命令，
//! 写入值作为命令参数（无参数命令忽略写入值）。

use crate::units::{mm_to_fs, mm_to_um};
use pistage_driver::TravelRange;
use std::fmt;

/// 属性值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// 浮点数
    Double,
    /// 布尔值
    Boolean,
    /// 字符串
    String,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Double => "double",
            DataType::Boolean => "boolean",
            DataType::String => "string",
        };
        f.write_str(name)
    }
}

/// 访问方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Access {
    /// 只读
    Read,
    /// 只写（命令触发）
    Write,
    /// 读写
    ReadWrite,
}

impl Access {
    /// 是否可读
    pub fn is_readable(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    /// 是否可写
    pub fn is_writable(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Access::Read => "R",
            Access::Write => "W",
            Access::ReadWrite => "RW",
        };
        f.write_str(name)
    }
}

/// 显示级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DisplayLevel {
    /// 普通操作员可见
    Operator,
    /// 仅专家视图可见
    Expert,
}

/// 单个属性的描述
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AttributeDescriptor {
    /// 属性名
    pub name: &'static str,
    /// 显示标签
    pub label: &'static str,
    /// 单位（无单位时为空）
    pub unit: &'static str,
    /// 值类型
    pub data_type: DataType,
    /// 访问方式
    pub access: Access,
    /// 显示级别
    pub display_level: DisplayLevel,
    /// 最小值
    pub min: Option<f64>,
    /// 最大值
    pub max: Option<f64>,
    /// 说明
    pub description: &'static str,
}

impl AttributeDescriptor {
    fn new(
        name: &'static str,
        label: &'static str,
        unit: &'static str,
        data_type: DataType,
        access: Access,
    ) -> Self {
        Self {
            name,
            label,
            unit,
            data_type,
            access,
            display_level: DisplayLevel::Operator,
            min: None,
            max: None,
            description: "",
        }
    }

    fn expert(mut self) -> Self {
        self.display_level = DisplayLevel::Expert;
        self
    }

    fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// 是否为命令触发属性
    pub fn is_command_trigger(&self) -> bool {
        self.name.starts_with("cmd_")
    }
}

const RELATIVE_POSITION: &str = "Position relative to set zero point";

/// 构建完整属性表
///
/// 顺序：只读属性、读写属性、命令触发属性。
pub fn attribute_table(range: &TravelRange) -> Vec<AttributeDescriptor> {
    use Access::*;
    use DataType::*;

    let (min, max) = (range.min, range.max);

    vec![
        // 位置读数
        AttributeDescriptor::new("position", RELATIVE_POSITION, "mm", Double, Read)
            .expert()
            .range(min, max),
        AttributeDescriptor::new("position_um", RELATIVE_POSITION, "um", Double, Read)
            .expert()
            .range(mm_to_um(min), mm_to_um(max)),
        AttributeDescriptor::new("position_fs", RELATIVE_POSITION, "fs", Double, Read)
            .expert()
            .range(mm_to_fs(min), mm_to_fs(max))
            .describe("Optical delay of the double-pass stage position"),
        AttributeDescriptor::new("position_unshifted_um", "Absolute position", "um", Double, Read)
            .expert()
            .range(mm_to_um(min), mm_to_um(max))
            .describe("Position without the zero offset applied"),
        // 行程边界
        AttributeDescriptor::new("position_min", "Minimum position", "mm", Double, Read),
        AttributeDescriptor::new("position_max", "Maximum position", "mm", Double, Read),
        AttributeDescriptor::new("position_min_um", "Minimum position", "um", Double, Read),
        AttributeDescriptor::new("position_max_um", "Maximum position", "um", Double, Read),
        AttributeDescriptor::new("position_min_fs", "Minimum position", "fs", Double, Read),
        AttributeDescriptor::new("position_max_fs", "Maximum position", "fs", Double, Read),
        // 状态
        AttributeDescriptor::new("on_target_state", "On target", "", Boolean, Read)
            .describe("Queries the controller; a true reading ends the Moving state"),
        AttributeDescriptor::new("last_error", "Last error", "", String, Read),
        AttributeDescriptor::new("server_message", "Server message", "", String, Read)
            .describe("Most recent diagnostic line"),
        AttributeDescriptor::new("controller_serial", "Controller serial", "", String, Read),
        AttributeDescriptor::new("state", "Device state", "", String, Read),
        // 读写
        AttributeDescriptor::new("velocity", "Velocity", "mm/s", Double, ReadWrite).expert(),
        AttributeDescriptor::new("velocity_umps", "Velocity", "um/s", Double, ReadWrite).expert(),
        AttributeDescriptor::new("move_step_size_um", "Move step size", "um", Double, ReadWrite)
            .describe("Increment used by move_step"),
        // 命令触发
        AttributeDescriptor::new("cmd_connect", "Connect", "", Double, Write),
        AttributeDescriptor::new("cmd_disconnect", "Disconnect", "", Double, Write),
        AttributeDescriptor::new("cmd_move_absolute", "Move absolute", "mm", Double, Write),
        AttributeDescriptor::new("cmd_move_absolute_um", "Move absolute", "um", Double, Write),
        AttributeDescriptor::new("cmd_move_absolute_fs", "Move absolute", "fs", Double, Write),
        AttributeDescriptor::new("cmd_move_relative_um", "Move relative", "um", Double, Write),
        AttributeDescriptor::new("cmd_move_step", "Move step", "", Double, Write)
            .describe("moves stage by pregiven step in input direction"),
        AttributeDescriptor::new("cmd_set_zero_position", "Set zero position", "", Double, Write),
        AttributeDescriptor::new("cmd_zero_reference_move", "Reference move", "", Double, Write),
        AttributeDescriptor::new("cmd_stop_motion", "Stop motion", "", Double, Write),
    ]
}

/// 按名称查找属性
pub fn find_attribute<'a>(
    table: &'a [AttributeDescriptor],
    name: &str,
) -> Option<&'a AttributeDescriptor> {
    table.iter().find(|descriptor| descriptor.name == name)
}
