//! 设备生命周期状态机
//!
//! 状态保存在 [`AtomicDeviceState`] 中，转换通过 compare-and-swap 提交：
//! 并发的 connect/move/stop 调用各自读取当前状态、按转换表计算目标状态，
//! CAS 失败时重读重算，不会丢失或交错转换。
//!
//! # 转换表
//!
//! | 事件 | Disconnected | Initializing | Ready | Moving | Faulted |
//! |---|---|---|---|---|---|
//! | connect 开始 | →Initializing | 非法 | 非法 | 非法 | →Initializing |
//! | connect 成功 | - | →Ready | - | - | - |
//! | connect 失败 | - | →Faulted | - | - | - |
//! | disconnect | - | →Disconnected | →Disconnected | →Disconnected | →Disconnected |
//! | 运动请求 | 非法 | 非法 | →Moving | 保持 Moving | 非法 |
//! | 观察到 on-target | - | - | - | →Ready | - |
//! | stop | - | - | - | →Ready | - |
//!
//! `-` 表示无操作。没有定时器，Moving→Ready 只由 on-target 查询触发；
//! Faulted 不会自动恢复，只能重新 connect。

use crate::error::StageError;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

/// 设备状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceState {
    /// 未连接（初始状态）
    #[default]
    Disconnected = 0,
    /// 正在建立连接
    Initializing = 1,
    /// 已连接、静止
    Ready = 2,
    /// 运动中（等待 on-target）
    Moving = 3,
    /// 连接失败
    Faulted = 4,
}

impl DeviceState {
    /// 从 u8 转换
    ///
    /// 如果值无效，返回 Disconnected。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::Moving,
            4 => Self::Faulted,
            _ => Self::Disconnected,
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 状态名称
    pub fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Initializing => "Initializing",
            Self::Ready => "Ready",
            Self::Moving => "Moving",
            Self::Faulted => "Faulted",
        }
    }

    /// 链路是否已建立（Ready 或 Moving）
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Ready | Self::Moving)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 状态机事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateEvent {
    /// connect() 开始
    ConnectStart,
    /// connect() 成功
    ConnectSucceeded,
    /// connect() 失败（返回 false 或出错）
    ConnectFailed,
    /// disconnect()
    Disconnect,
    /// 任意运动命令
    MoveRequest,
    /// on-target 查询返回 true
    OnTargetObserved,
    /// stop_motion()
    Stop,
}

impl StateEvent {
    /// 事件名称
    pub fn name(self) -> &'static str {
        match self {
            Self::ConnectStart => "connect_start",
            Self::ConnectSucceeded => "connect_succeeded",
            Self::ConnectFailed => "connect_failed",
            Self::Disconnect => "disconnect",
            Self::MoveRequest => "move_request",
            Self::OnTargetObserved => "on_target_observed",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for StateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 按转换表计算下一状态
///
/// `None` 表示事件在该状态下非法；返回原状态表示无操作。
pub fn next_state(from: DeviceState, event: StateEvent) -> Option<DeviceState> {
    use DeviceState::*;
    use StateEvent::*;

    match (event, from) {
        (ConnectStart, Disconnected | Faulted) => Some(Initializing),
        (ConnectStart, _) => None,

        (ConnectSucceeded, Initializing) => Some(Ready),
        (ConnectFailed, Initializing) => Some(Faulted),
        (ConnectSucceeded | ConnectFailed, state) => Some(state),

        (Disconnect, _) => Some(Disconnected),

        (MoveRequest, Ready | Moving) => Some(Moving),
        (MoveRequest, _) => None,

        (OnTargetObserved, Moving) => Some(Ready),
        (OnTargetObserved, state) => Some(state),

        // 停止总是回到 Ready，包括 Faulted / Disconnected
        (Stop, _) => Some(Ready),
    }
}

/// 一次已提交的转换
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// 转换前状态
    pub from: DeviceState,
    /// 转换后状态
    pub to: DeviceState,
}

impl Transition {
    /// 状态是否实际改变
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// 设备状态（原子版本，用于线程间共享）
#[derive(Debug)]
pub struct AtomicDeviceState {
    inner: AtomicU8,
}

impl AtomicDeviceState {
    /// 创建新的原子状态
    pub fn new(state: DeviceState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    /// 获取当前状态
    pub fn get(&self, ordering: Ordering) -> DeviceState {
        DeviceState::from_u8(self.inner.load(ordering))
    }

    /// 比较并交换（Compare-and-Swap）
    ///
    /// 如果当前值等于 `current`，则设置为 `new` 并返回 true，否则返回 false。
    pub fn compare_exchange(
        &self,
        current: DeviceState,
        new: DeviceState,
        success: Ordering,
        failure: Ordering,
    ) -> bool {
        self.inner
            .compare_exchange(current.as_u8(), new.as_u8(), success, failure)
            .is_ok()
    }
}

impl Default for AtomicDeviceState {
    fn default() -> Self {
        Self::new(DeviceState::Disconnected)
    }
}

/// 设备状态机
///
/// 只能通过 [`apply`](Self::apply) 改变状态。
#[derive(Debug, Default)]
pub struct StateMachine {
    state: AtomicDeviceState,
}

impl StateMachine {
    /// 创建状态机（初始 Disconnected）
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前状态
    pub fn state(&self) -> DeviceState {
        self.state.get(Ordering::Acquire)
    }

    /// 应用事件
    ///
    /// # 错误
    ///
    /// 事件在当前状态下非法时返回 [`StageError::InvalidTransition`]，状态不变。
    pub fn apply(&self, event: StateEvent) -> Result<Transition, StageError> {
        loop {
            let from = self.state();
            let to = next_state(from, event)
                .ok_or(StageError::InvalidTransition { from, event })?;

            if from == to {
                return Ok(Transition { from, to });
            }

            if self
                .state
                .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            {
                debug!(%from, %to, %event, "device state transition");
                return Ok(Transition { from, to });
            }
            // 其他线程抢先提交，按新状态重算
        }
    }
}
