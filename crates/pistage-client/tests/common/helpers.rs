//! 测试辅助函数
//!
//! 提供快速创建 facade + 驱动句柄的工具函数。

use super::mock_driver::MockDriver;
use pistage_client::{DelayStage, DelayStageBuilder};
use pistage_driver::{DiagnosticSink, SimulatedStage, SimulationConfig, TravelRange};

pub const CONTROLLER: &str = "117018374";

/// 模拟位移台环境（0–50 mm）
pub fn simulated_stage() -> (DelayStage<SimulatedStage>, SimulatedStage) {
    simulated_stage_with_config(SimulationConfig::default())
}

/// 使用自定义模拟参数
pub fn simulated_stage_with_config(
    config: SimulationConfig,
) -> (DelayStage<SimulatedStage>, SimulatedStage) {
    let sink = DiagnosticSink::new();
    let sim = SimulatedStage::new(CONTROLLER, config, sink.clone());
    let stage = DelayStageBuilder::new(CONTROLLER)
        .diagnostics(sink)
        .build(sim.clone());
    (stage, sim)
}

/// Mock 驱动环境（0–50 mm）
pub fn mock_stage() -> (DelayStage<MockDriver>, MockDriver) {
    let driver = MockDriver::new(TravelRange::new(0.0, 50.0));
    let stage = DelayStageBuilder::new(CONTROLLER).build(driver.clone());
    (stage, driver)
}

/// 断言两个浮点数在容差内相等
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual} (tolerance {tolerance})"
    );
}
