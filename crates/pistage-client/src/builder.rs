//! Builder 模式实现
//!
//! 提供链式构造 [`DelayStage`] 的便捷方式。控制器序列号是必填参数，
//! 在进程启动时传入，之后不可修改。

use crate::device::{DEFAULT_MOVE_STEP_SIZE_MM, DelayStage};
use crate::units::{Micrometer, Millimeter};
use pistage_driver::{DiagnosticSink, StageDriver};

/// DelayStage Builder（链式构造）
///
/// # Example
///
/// ```rust
/// use pistage_client::DelayStageBuilder;
/// use pistage_driver::{DiagnosticSink, SimulatedStage};
///
/// let sink = DiagnosticSink::new();
/// let driver = SimulatedStage::with_defaults("117018374", sink.clone());
///
/// let stage = DelayStageBuilder::new("117018374")
///     .move_step_size_um(5.0)
///     .diagnostics(sink)
///     .build(driver);
///
/// assert_eq!(stage.controller_serial(), "117018374");
/// assert_eq!(stage.move_step_size_um(), 5.0);
/// ```
#[derive(Debug, Clone)]
pub struct DelayStageBuilder {
    /// 控制器序列号
    controller: String,
    /// 步进大小（mm）
    move_step_size: Millimeter,
    /// 诊断槽位（未设置时新建一个独立槽位）
    diagnostics: Option<DiagnosticSink>,
}

impl DelayStageBuilder {
    /// 创建新的 Builder
    pub fn new(controller: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            move_step_size: Millimeter(DEFAULT_MOVE_STEP_SIZE_MM),
            diagnostics: None,
        }
    }

    /// 设置初始步进大小（µm，默认 1 µm）
    pub fn move_step_size_um(mut self, step_um: f64) -> Self {
        self.move_step_size = Micrometer(step_um).to_mm();
        self
    }

    /// 设置诊断槽位
    ///
    /// 应与驱动使用同一个槽位，`server_message` 才能读到驱动的输出。
    pub fn diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// 构建 facade（初始状态 Disconnected，不调用驱动）
    pub fn build<D: StageDriver>(self, driver: D) -> DelayStage<D> {
        DelayStage::new(
            self.controller,
            driver,
            self.move_step_size,
            self.diagnostics.unwrap_or_default(),
        )
    }
}
