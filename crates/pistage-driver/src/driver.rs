//! 位移台驱动能力接口
//!
//! 上层 facade 只通过 [`StageDriver`] 访问硬件，不关心串口/USB 链路和 GCS 协议细节。
//!
//! # 单位约定
//!
//! 所有长度均为驱动的原生单位（毫米），速度为 mm/s。
//! 单位换算（µm、fs）由 client 层负责。

use crate::error::DriverError;

/// 驱动层 Result 类型别名
pub type Result<T> = std::result::Result<T, DriverError>;

/// 行程范围（原生单位 mm）
///
/// 由控制器在构造时上报，设备生命周期内不变。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TravelRange {
    /// 最小位置（mm）
    pub min: f64,
    /// 最大位置（mm）
    pub max: f64,
}

impl TravelRange {
    /// 创建行程范围
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// 行程长度
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// 位置是否在行程范围内（含边界）
    pub fn contains(&self, position: f64) -> bool {
        position >= self.min && position <= self.max
    }
}

/// 单轴位移台驱动能力
///
/// 每个调用都可能失败。facade 的错误处理约定：
/// - `connect` 失败 → 状态机进入 Faulted
/// - 运动类调用失败 → 记录到错误记录，不改变状态
///
/// 方法使用 `&mut self`：硬件链路天然是单所有者，
/// 并发调用由 facade 持有的互斥锁串行化。
pub trait StageDriver: Send {
    /// 打开到控制器的链路
    ///
    /// 返回 `Ok(false)` 表示控制器拒绝连接（非 IO 错误）。
    fn connect(&mut self) -> Result<bool>;

    /// 关闭链路
    fn disconnect(&mut self) -> Result<()>;

    /// 当前位置（相对于零点，mm）
    fn position(&mut self) -> Result<f64>;

    /// 当前绝对位置（不减零点偏移，mm）
    fn position_unshifted(&mut self) -> Result<f64>;

    /// 绝对运动（目标位于零点坐标系，mm）
    fn move_absolute(&mut self, target: f64) -> Result<()>;

    /// 相对运动（mm）
    fn move_relative(&mut self, delta: f64) -> Result<()>;

    /// 最近一次运动是否已在容差内到位
    fn on_target(&mut self) -> Result<bool>;

    /// 以当前绝对位置重新定义零点（不运动）
    fn set_zero_position(&mut self) -> Result<()>;

    /// 停止运动
    fn stop_motion(&mut self) -> Result<()>;

    /// 参考点运动（回零）
    fn zero_reference_move(&mut self) -> Result<()>;

    /// 回零后重新同步软限位
    fn handle_limits(&mut self) -> Result<()>;

    /// 当前速度（mm/s）
    fn velocity(&mut self) -> Result<f64>;

    /// 设置速度（mm/s）
    fn set_velocity(&mut self, velocity: f64) -> Result<()>;

    /// 控制器最近一次错误（文本）
    fn last_error(&mut self) -> Result<String>;

    /// 行程范围（构造时固定）
    fn travel_range(&self) -> TravelRange;
}

impl<T: StageDriver + ?Sized> StageDriver for Box<T> {
    fn connect(&mut self) -> Result<bool> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }

    fn position(&mut self) -> Result<f64> {
        (**self).position()
    }

    fn position_unshifted(&mut self) -> Result<f64> {
        (**self).position_unshifted()
    }

    fn move_absolute(&mut self, target: f64) -> Result<()> {
        (**self).move_absolute(target)
    }

    fn move_relative(&mut self, delta: f64) -> Result<()> {
        (**self).move_relative(delta)
    }

    fn on_target(&mut self) -> Result<bool> {
        (**self).on_target()
    }

    fn set_zero_position(&mut self) -> Result<()> {
        (**self).set_zero_position()
    }

    fn stop_motion(&mut self) -> Result<()> {
        (**self).stop_motion()
    }

    fn zero_reference_move(&mut self) -> Result<()> {
        (**self).zero_reference_move()
    }

    fn handle_limits(&mut self) -> Result<()> {
        (**self).handle_limits()
    }

    fn velocity(&mut self) -> Result<f64> {
        (**self).velocity()
    }

    fn set_velocity(&mut self, velocity: f64) -> Result<()> {
        (**self).set_velocity(velocity)
    }

    fn last_error(&mut self) -> Result<String> {
        (**self).last_error()
    }

    fn travel_range(&self) -> TravelRange {
        (**self).travel_range()
    }
}
