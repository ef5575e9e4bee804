//! 模拟 PI 线性位移台
//!
//! 无硬件时使用的确定性模型，实现 [`StageDriver`]。
//!
//! # 运动模型
//!
//! - 从起点到目标按当前速度线性插值，走完全程即到位（on-target）
//! - 目标位置位于零点坐标系，限位检查使用绝对位置
//! - `finish_motion()` 直接跳到目标，测试中用于模拟"驱动报告到位"
//!
//! # 错误码
//!
//! 参照 PI GCS 错误表中与单轴运动相关的几项：
//!
//! | 码 | 含义 |
//! |---|---|
//! | 0 | No error |
//! | 7 | Position out of limits |
//! | 10 | Controller was stopped by command |
//! | 17 | Parameter out of range |
//!
//! # 共享句柄
//!
//! `SimulatedStage` 可克隆，克隆共享同一个内部状态。facade 持有一份，
//! 测试持有另一份用于注入故障、推进运动。

use crate::diagnostics::DiagnosticSink;
use crate::driver::{Result, StageDriver, TravelRange};
use crate::error::DriverError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// 命令历史保留的最大条数
pub const HISTORY_CAPACITY: usize = 256;

/// 控制器错误码（GCS 子集）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ControllerErrorCode {
    /// 无错误
    NoError = 0,
    /// 目标超出行程
    PositionOutOfLimits = 7,
    /// 运动被 STP 命令中止
    StoppedByCommand = 10,
    /// 参数超出范围（如速度）
    ParameterOutOfRange = 17,
}

impl ControllerErrorCode {
    /// 数值错误码
    pub fn code(self) -> i32 {
        self as i32
    }

    /// 错误描述
    pub fn message(self) -> &'static str {
        match self {
            Self::NoError => "No error",
            Self::PositionOutOfLimits => "Position out of limits",
            Self::StoppedByCommand => "Controller was stopped by command",
            Self::ParameterOutOfRange => "Parameter out of range",
        }
    }

    fn to_error(self) -> DriverError {
        DriverError::Controller {
            code: self.code(),
            message: self.message().to_string(),
        }
    }
}

/// 模拟参数
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    /// 行程下限（mm），同时作为参考点
    pub travel_min_mm: f64,
    /// 行程上限（mm）
    pub travel_max_mm: f64,
    /// 初始速度（mm/s）
    pub velocity_mm_per_s: f64,
    /// 允许的最大速度（mm/s）
    pub max_velocity_mm_per_s: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            travel_min_mm: 0.0,
            travel_max_mm: 50.0,
            velocity_mm_per_s: 1.0,
            max_velocity_mm_per_s: 10.0,
        }
    }
}

impl SimulationConfig {
    /// 行程范围
    pub fn travel_range(&self) -> TravelRange {
        TravelRange::new(self.travel_min_mm, self.travel_max_mm)
    }
}

/// 进行中的运动
#[derive(Debug, Clone, Copy)]
struct Motion {
    start: f64,
    target: f64,
    velocity: f64,
    started: Instant,
}

impl Motion {
    /// 当前绝对位置
    fn position_at(&self, now: Instant) -> f64 {
        let distance = self.target - self.start;
        let traveled = self.velocity * now.duration_since(self.started).as_secs_f64();
        if traveled >= distance.abs() {
            self.target
        } else {
            self.start + distance.signum() * traveled
        }
    }

    fn is_done(&self, now: Instant) -> bool {
        self.position_at(now) == self.target
    }
}

#[derive(Debug)]
struct SimState {
    config: SimulationConfig,
    connected: bool,
    fail_next_connect: bool,
    /// 静止时的绝对位置（运动中为起点）
    absolute: f64,
    zero_offset: f64,
    velocity: f64,
    motion: Option<Motion>,
    last_error: (i32, String),
    history: VecDeque<String>,
}

impl SimState {
    fn new(config: SimulationConfig) -> Self {
        let velocity = config.velocity_mm_per_s;
        let absolute = config.travel_min_mm;
        Self {
            config,
            connected: false,
            fail_next_connect: false,
            absolute,
            zero_offset: 0.0,
            velocity,
            motion: None,
            last_error: (
                ControllerErrorCode::NoError.code(),
                ControllerErrorCode::NoError.message().to_string(),
            ),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(DriverError::NotConnected)
        }
    }

    /// 到位的运动落定为静止位置
    fn settle(&mut self, now: Instant) {
        if let Some(motion) = self.motion {
            if motion.is_done(now) {
                self.absolute = motion.target;
                self.motion = None;
            }
        }
    }

    fn current_absolute(&self, now: Instant) -> f64 {
        match self.motion {
            Some(motion) => motion.position_at(now),
            None => self.absolute,
        }
    }

    /// MVR 以当前目标为基准（运动中叠加）
    fn commanded_absolute(&self) -> f64 {
        match self.motion {
            Some(motion) => motion.target,
            None => self.absolute,
        }
    }

    fn fail(&mut self, code: ControllerErrorCode) -> DriverError {
        self.last_error = (code.code(), code.message().to_string());
        code.to_error()
    }

    fn start_motion(&mut self, absolute_target: f64) -> Result<()> {
        if !absolute_target.is_finite() {
            return Err(DriverError::InvalidInput(format!(
                "target position {absolute_target} is not finite"
            )));
        }
        if !self.config.travel_range().contains(absolute_target) {
            return Err(self.fail(ControllerErrorCode::PositionOutOfLimits));
        }

        let now = Instant::now();
        let start = self.current_absolute(now);
        self.absolute = start;
        self.motion = Some(Motion {
            start,
            target: absolute_target,
            velocity: self.velocity,
            started: now,
        });
        Ok(())
    }
}

/// 模拟 PI 单轴位移台
#[derive(Clone)]
pub struct SimulatedStage {
    controller: Arc<str>,
    state: Arc<Mutex<SimState>>,
    diagnostics: DiagnosticSink,
}

impl SimulatedStage {
    /// 创建模拟位移台
    ///
    /// # 参数
    ///
    /// - `controller`: 控制器序列号（仅用于诊断输出）
    /// - `config`: 模拟参数
    /// - `diagnostics`: 诊断输出槽位
    pub fn new(
        controller: impl Into<String>,
        config: SimulationConfig,
        diagnostics: DiagnosticSink,
    ) -> Self {
        let controller: String = controller.into();
        Self {
            controller: Arc::from(controller),
            state: Arc::new(Mutex::new(SimState::new(config))),
            diagnostics,
        }
    }

    /// 使用默认参数（0–50 mm 行程）
    pub fn with_defaults(controller: impl Into<String>, diagnostics: DiagnosticSink) -> Self {
        Self::new(controller, SimulationConfig::default(), diagnostics)
    }

    /// 下一次 `connect()` 返回 false
    pub fn fail_next_connect(&self) {
        self.state.lock().fail_next_connect = true;
    }

    /// 注入一条控制器错误（不改变运动状态）
    pub fn inject_error(&self, code: i32, message: impl Into<String>) {
        self.state.lock().last_error = (code, message.into());
    }

    /// 立即完成当前运动
    pub fn finish_motion(&self) {
        let mut state = self.state.lock();
        if let Some(motion) = state.motion.take() {
            state.absolute = motion.target;
        }
    }

    /// 是否有运动在进行
    pub fn is_moving(&self) -> bool {
        let mut state = self.state.lock();
        state.settle(Instant::now());
        state.motion.is_some()
    }

    /// 链路是否打开
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// 已执行的改变状态的命令（按顺序，最多保留 [`HISTORY_CAPACITY`] 条）
    pub fn command_history(&self) -> Vec<String> {
        self.state.lock().history.iter().cloned().collect()
    }

    fn log_command(state: &mut SimState, command: String) {
        debug!(command = %command, "simulated stage command");
        if state.history.len() == HISTORY_CAPACITY {
            state.history.pop_front();
        }
        state.history.push_back(command);
    }
}

impl StageDriver for SimulatedStage {
    fn connect(&mut self) -> Result<bool> {
        let mut state = self.state.lock();
        Self::log_command(&mut state, "connect".to_string());

        if state.fail_next_connect {
            state.fail_next_connect = false;
            drop(state);
            warn!(controller = %self.controller, "simulated connection refused");
            self.diagnostics
                .emit(format!("connection to controller {} failed", self.controller));
            return Ok(false);
        }

        state.connected = true;
        drop(state);
        self.diagnostics
            .emit(format!("connected to controller {}", self.controller));
        Ok(true)
    }

    fn disconnect(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        Self::log_command(&mut state, "disconnect".to_string());
        let now = Instant::now();
        state.absolute = state.current_absolute(now);
        state.motion = None;
        state.connected = false;
        drop(state);
        self.diagnostics
            .emit(format!("disconnected from controller {}", self.controller));
        Ok(())
    }

    fn position(&mut self) -> Result<f64> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        let now = Instant::now();
        state.settle(now);
        Ok(state.current_absolute(now) - state.zero_offset)
    }

    fn position_unshifted(&mut self) -> Result<f64> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        let now = Instant::now();
        state.settle(now);
        Ok(state.current_absolute(now))
    }

    fn move_absolute(&mut self, target: f64) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        Self::log_command(&mut state, format!("move_absolute {target}"));
        let absolute_target = target + state.zero_offset;
        state.start_motion(absolute_target)?;
        drop(state);
        self.diagnostics.emit(format!("moving to {target:.4} mm"));
        Ok(())
    }

    fn move_relative(&mut self, delta: f64) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        Self::log_command(&mut state, format!("move_relative {delta}"));
        let absolute_target = state.commanded_absolute() + delta;
        state.start_motion(absolute_target)?;
        drop(state);
        self.diagnostics.emit(format!("moving by {delta:.4} mm"));
        Ok(())
    }

    fn on_target(&mut self) -> Result<bool> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        state.settle(Instant::now());
        Ok(state.motion.is_none())
    }

    fn set_zero_position(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        Self::log_command(&mut state, "set_zero_position".to_string());
        let now = Instant::now();
        state.settle(now);
        state.zero_offset = state.current_absolute(now);
        let offset = state.zero_offset;
        drop(state);
        self.diagnostics
            .emit(format!("zero point set at {offset:.4} mm"));
        Ok(())
    }

    fn stop_motion(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        Self::log_command(&mut state, "stop_motion".to_string());
        let now = Instant::now();
        state.settle(now);
        if state.motion.is_some() {
            state.absolute = state.current_absolute(now);
            state.motion = None;
            // STP 会在控制器中留下错误 10
            let _ = state.fail(ControllerErrorCode::StoppedByCommand);
        }
        drop(state);
        self.diagnostics.emit("motion stopped");
        Ok(())
    }

    fn zero_reference_move(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        Self::log_command(&mut state, "zero_reference_move".to_string());
        let reference = state.config.travel_min_mm;
        state.start_motion(reference)?;
        drop(state);
        self.diagnostics
            .emit(format!("reference move to {reference:.4} mm"));
        Ok(())
    }

    fn handle_limits(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        Self::log_command(&mut state, "handle_limits".to_string());
        let range = state.config.travel_range();
        state.settle(Instant::now());
        if state.motion.is_none() {
            state.absolute = state.absolute.clamp(range.min, range.max);
        }
        drop(state);
        self.diagnostics.emit(format!(
            "limits synchronized: [{:.4}, {:.4}] mm",
            range.min, range.max
        ));
        Ok(())
    }

    fn velocity(&mut self) -> Result<f64> {
        let state = self.state.lock();
        state.ensure_connected()?;
        Ok(state.velocity)
    }

    fn set_velocity(&mut self, velocity: f64) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        Self::log_command(&mut state, format!("set_velocity {velocity}"));
        if !velocity.is_finite() || velocity <= 0.0 || velocity > state.config.max_velocity_mm_per_s
        {
            return Err(state.fail(ControllerErrorCode::ParameterOutOfRange));
        }
        state.velocity = velocity;
        Ok(())
    }

    fn last_error(&mut self) -> Result<String> {
        let state = self.state.lock();
        state.ensure_connected()?;
        let (code, message) = &state.last_error;
        Ok(format!("{code}: {message}"))
    }

    fn travel_range(&self) -> TravelRange {
        self.state.lock().config.travel_range()
    }
}
