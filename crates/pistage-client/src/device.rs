//! 位移台 facade
//!
//! [`DelayStage`] 独占一个 [`StageDriver`]，在其上维护设备生命周期状态机，
//! 并把同一组物理量（位置、行程、速度）以 mm / µm / fs 三套单位暴露。
//!
//! # 错误处理约定
//!
//! - 状态机拒绝的请求返回 [`StageError::InvalidTransition`]，驱动不会被调用
//! - 运动/配置类命令的驱动错误**不会**作为 `Err` 返回：错误文本写入错误记录，
//!   输出 `warn!` 日志和一条诊断消息，命令返回 `Ok(())`
//! - 读取类操作的驱动错误以 [`StageError::Driver`] 返回
//!
//! # 有副作用的查询
//!
//! [`DelayStage::on_target_state`] 不是纯查询：驱动报告到位且设备处于
//! Moving 时，它把设备转回 Ready。这是 Moving→Ready 的唯一触发方式
//! （除 stop_motion 外），没有后台轮询。
//!
//! # 并发
//!
//! 所有方法都是 `&self`，可以从多个线程同时调用：
//! - 状态转换通过原子 CAS 提交
//! - 驱动调用由互斥锁串行化
//! - 诊断槽位使用原子替换

use crate::error::StageError;
use crate::state::{DeviceState, StateEvent, StateMachine};
use crate::units::{Femtosecond, Micrometer, Millimeter, MicrometerPerSecond, MillimeterPerSecond};
use parking_lot::Mutex;
use pistage_driver::{DiagnosticSink, StageDriver, TravelRange};
use tracing::{info, warn};

/// 默认步进：0.001 mm（1 µm）
pub const DEFAULT_MOVE_STEP_SIZE_MM: f64 = 0.001;

/// PI 线性延迟台 facade
///
/// 通过 [`DelayStageBuilder`](crate::builder::DelayStageBuilder) 构造。
pub struct DelayStage<D: StageDriver> {
    controller: String,
    driver: Mutex<D>,
    machine: StateMachine,
    travel: TravelRange,
    move_step_size: Mutex<Millimeter>,
    diagnostics: DiagnosticSink,
    /// 驱动无法查询时 `last_error()` 的回退文本
    last_failure: Mutex<String>,
}

impl<D: StageDriver> DelayStage<D> {
    pub(crate) fn new(
        controller: String,
        driver: D,
        move_step_size: Millimeter,
        diagnostics: DiagnosticSink,
    ) -> Self {
        let travel = driver.travel_range();
        Self {
            controller,
            driver: Mutex::new(driver),
            machine: StateMachine::new(),
            travel,
            move_step_size: Mutex::new(move_step_size),
            diagnostics,
            last_failure: Mutex::new(String::new()),
        }
    }

    // ==================== 生命周期 ====================

    /// 连接控制器
    ///
    /// 成功进入 Ready；驱动返回 false 或出错进入 Faulted。
    /// 两种情况都返回 `Ok(新状态)`。
    ///
    /// # 错误
    ///
    /// 仅在 Disconnected / Faulted 之外的状态下调用时返回
    /// [`StageError::InvalidTransition`]。
    pub fn connect(&self) -> Result<DeviceState, StageError> {
        self.machine.apply(StateEvent::ConnectStart)?;
        info!(controller = %self.controller, "Connecting to controller");

        let result = self.driver.lock().connect();
        let event = match result {
            Ok(true) => StateEvent::ConnectSucceeded,
            Ok(false) => {
                self.record_failure("connect", "controller refused the connection".to_string());
                StateEvent::ConnectFailed
            },
            Err(e) => {
                self.record_failure("connect", e.to_string());
                StateEvent::ConnectFailed
            },
        };

        let transition = self.machine.apply(event)?;
        info!(controller = %self.controller, state = %transition.to, "Connect finished");
        Ok(transition.to)
    }

    /// 断开连接
    ///
    /// 任何状态都可以断开；已经是 Disconnected 时不调用驱动。
    pub fn disconnect(&self) -> Result<(), StageError> {
        let mut driver = self.driver.lock();
        if self.machine.state() == DeviceState::Disconnected {
            return Ok(());
        }

        let result = driver.disconnect();
        self.machine.apply(StateEvent::Disconnect)?;
        drop(driver);
        self.absorb("disconnect", result);
        info!(controller = %self.controller, "Disconnected");
        Ok(())
    }

    // ==================== 运动命令 ====================

    /// 绝对运动（mm，零点坐标系）
    pub fn move_absolute(&self, target_mm: f64) -> Result<(), StageError> {
        info!(target_mm, "Move absolute");
        self.dispatch_move("move_absolute", |driver| driver.move_absolute(target_mm))
    }

    /// 绝对运动（µm）
    pub fn move_absolute_um(&self, target_um: f64) -> Result<(), StageError> {
        self.move_absolute(Micrometer(target_um).to_mm().0)
    }

    /// 绝对运动（fs 光学延迟）
    pub fn move_absolute_fs(&self, target_fs: f64) -> Result<(), StageError> {
        self.move_absolute(Femtosecond(target_fs).to_mm().0)
    }

    /// 相对运动（mm）
    pub fn move_relative(&self, delta_mm: f64) -> Result<(), StageError> {
        info!(delta_mm, "Move relative");
        self.dispatch_move("move_relative", |driver| driver.move_relative(delta_mm))
    }

    /// 相对运动（µm）
    pub fn move_relative_um(&self, delta_um: f64) -> Result<(), StageError> {
        self.move_relative(Micrometer(delta_um).to_mm().0)
    }

    /// 按步进大小走一步
    ///
    /// 只使用 `direction` 的符号：`>= 0` 正向，否则反向。
    pub fn move_step(&self, direction: f64) -> Result<(), StageError> {
        let step = *self.move_step_size.lock();
        let delta = if direction >= 0.0 { step } else { -step };
        self.move_relative(delta.0)
    }

    /// 停止运动
    ///
    /// 任何状态下都合法，结束后总是 Ready。驱动总会收到停止命令；
    /// 未连接时驱动报错，错误按命令失败记录。
    pub fn stop_motion(&self) -> Result<(), StageError> {
        info!("Stop motion");
        let mut driver = self.driver.lock();
        let result = driver.stop_motion();
        self.machine.apply(StateEvent::Stop)?;
        drop(driver);
        self.absorb("stop_motion", result);
        Ok(())
    }

    /// 以当前位置为零点（不运动）
    pub fn set_zero_position(&self) -> Result<(), StageError> {
        info!("Set zero position");
        let result = self.driver.lock().set_zero_position();
        self.absorb("set_zero_position", result);
        Ok(())
    }

    /// 回零：参考点运动后重新同步软限位
    ///
    /// 参考点运动失败时不再同步限位。不改变设备状态。
    pub fn zero_reference_move(&self) -> Result<(), StageError> {
        info!(controller = %self.controller, "Zero reference move");
        let mut driver = self.driver.lock();
        let result = driver.zero_reference_move().and_then(|()| driver.handle_limits());
        drop(driver);
        self.absorb("zero_reference_move", result);
        Ok(())
    }

    // ==================== 位置读数 ====================

    /// 当前位置（mm，相对零点）
    pub fn position(&self) -> Result<f64, StageError> {
        Ok(self.driver.lock().position()?)
    }

    /// 当前位置（µm）
    pub fn position_um(&self) -> Result<f64, StageError> {
        Ok(Millimeter(self.position()?).to_um().0)
    }

    /// 当前位置（fs）
    pub fn position_fs(&self) -> Result<f64, StageError> {
        Ok(Millimeter(self.position()?).to_fs().0)
    }

    /// 绝对位置（mm，不减零点偏移）
    pub fn position_unshifted(&self) -> Result<f64, StageError> {
        Ok(self.driver.lock().position_unshifted()?)
    }

    /// 绝对位置（µm）
    pub fn position_unshifted_um(&self) -> Result<f64, StageError> {
        Ok(Millimeter(self.position_unshifted()?).to_um().0)
    }

    // ==================== 行程边界 ====================

    /// 行程范围（mm）
    pub fn travel_range(&self) -> TravelRange {
        self.travel
    }

    /// 行程下限（mm）
    pub fn position_min(&self) -> f64 {
        self.travel.min
    }

    /// 行程上限（mm）
    pub fn position_max(&self) -> f64 {
        self.travel.max
    }

    /// 行程下限（µm）
    pub fn position_min_um(&self) -> f64 {
        Millimeter(self.travel.min).to_um().0
    }

    /// 行程上限（µm）
    pub fn position_max_um(&self) -> f64 {
        Millimeter(self.travel.max).to_um().0
    }

    /// 行程下限（fs）
    pub fn position_min_fs(&self) -> f64 {
        Millimeter(self.travel.min).to_fs().0
    }

    /// 行程上限（fs）
    pub fn position_max_fs(&self) -> f64 {
        Millimeter(self.travel.max).to_fs().0
    }

    // ==================== 速度 ====================

    /// 当前速度（mm/s）
    pub fn velocity(&self) -> Result<f64, StageError> {
        Ok(self.driver.lock().velocity()?)
    }

    /// 设置速度（mm/s）
    pub fn set_velocity(&self, velocity_mmps: f64) -> Result<(), StageError> {
        info!(velocity_mmps, "Set velocity");
        let result = self.driver.lock().set_velocity(velocity_mmps);
        self.absorb("set_velocity", result);
        Ok(())
    }

    /// 当前速度（µm/s）
    pub fn velocity_umps(&self) -> Result<f64, StageError> {
        Ok(MillimeterPerSecond(self.velocity()?).to_umps().0)
    }

    /// 设置速度（µm/s）
    pub fn set_velocity_umps(&self, velocity_umps: f64) -> Result<(), StageError> {
        self.set_velocity(MicrometerPerSecond(velocity_umps).to_mmps().0)
    }

    // ==================== 步进 ====================

    /// 步进大小（µm）
    pub fn move_step_size_um(&self) -> f64 {
        self.move_step_size.lock().to_um().0
    }

    /// 设置步进大小（µm）
    pub fn set_move_step_size_um(&self, step_um: f64) {
        *self.move_step_size.lock() = Micrometer(step_um).to_mm();
    }

    // ==================== 状态 ====================

    /// 查询是否到位
    ///
    /// **有副作用**：驱动报告到位且设备处于 Moving 时转为 Ready。
    /// 其他状态下到位读数不改变状态。
    pub fn on_target_state(&self) -> Result<bool, StageError> {
        // 读数和状态提交在同一把驱动锁内，避免把刚下发的运动误判为到位
        let mut driver = self.driver.lock();
        let on_target = driver.on_target()?;
        if on_target {
            self.machine.apply(StateEvent::OnTargetObserved)?;
        }
        Ok(on_target)
    }

    /// 最近一次错误（文本）
    ///
    /// 优先返回驱动报告的错误；驱动无法查询时返回 facade 记录的最近一次失败。
    pub fn last_error(&self) -> String {
        match self.driver.lock().last_error() {
            Ok(text) => text,
            Err(_) => self.last_failure.lock().clone(),
        }
    }

    /// 最近一条诊断消息
    pub fn server_message(&self) -> String {
        self.diagnostics.peek()
    }

    /// 控制器序列号
    pub fn controller_serial(&self) -> &str {
        &self.controller
    }

    /// 当前设备状态
    pub fn state(&self) -> DeviceState {
        self.machine.state()
    }

    /// 诊断槽位句柄
    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.diagnostics
    }

    // ==================== 内部 ====================

    /// 运动命令：持有驱动锁提交 MoveRequest，再在同一把锁内下发
    fn dispatch_move(
        &self,
        operation: &str,
        command: impl FnOnce(&mut D) -> pistage_driver::driver::Result<()>,
    ) -> Result<(), StageError> {
        let mut driver = self.driver.lock();
        self.machine.apply(StateEvent::MoveRequest)?;
        let result = command(&mut driver);
        drop(driver);
        self.absorb(operation, result);
        Ok(())
    }

    /// 吸收命令类调用的驱动错误
    fn absorb(&self, operation: &str, result: pistage_driver::driver::Result<()>) {
        if let Err(e) = result {
            self.record_failure(operation, e.to_string());
        }
    }

    fn record_failure(&self, operation: &str, text: String) {
        warn!(operation, error = %text, "Stage command failed");
        self.diagnostics.emit(format!("{operation} failed: {text}"));
        *self.last_failure.lock() = text;
    }
}

impl<D: StageDriver> std::fmt::Debug for DelayStage<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayStage")
            .field("controller", &self.controller)
            .field("state", &self.state())
            .field("travel", &self.travel)
            .finish_non_exhaustive()
    }
}
