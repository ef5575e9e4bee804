//! DelayStage 集成测试
//!
//! 覆盖连接、运动、到位、停止、回零的完整流程，以及驱动出错时的行为。

mod common;

use common::helpers::{assert_close, mock_stage, simulated_stage, simulated_stage_with_config};
use common::mock_driver::MockDriver;
use pistage_client::{DelayStage, DeviceState, StageError, attribute_table};
use pistage_driver::SimulationConfig;

// ==================== 生命周期 ====================

#[test]
fn test_connect_move_settle_cycle() {
    let (stage, sim) = simulated_stage();
    assert_eq!(stage.state(), DeviceState::Disconnected);

    assert_eq!(stage.connect().unwrap(), DeviceState::Ready);

    stage.move_absolute(10.0).unwrap();
    assert_eq!(stage.state(), DeviceState::Moving);

    // 尚未到位：保持 Moving
    assert!(!stage.on_target_state().unwrap());
    assert_eq!(stage.state(), DeviceState::Moving);

    sim.finish_motion();
    assert!(stage.on_target_state().unwrap());
    assert_eq!(stage.state(), DeviceState::Ready);
    assert_close(stage.position().unwrap(), 10.0, 1e-12);
}

#[test]
fn test_on_target_while_ready_has_no_side_effect() {
    let (stage, _) = simulated_stage();
    stage.connect().unwrap();
    assert!(stage.on_target_state().unwrap());
    assert_eq!(stage.state(), DeviceState::Ready);
}

#[test]
fn test_move_um_equals_move_mm() {
    let (a, sim_a) = simulated_stage();
    let (b, sim_b) = simulated_stage();
    a.connect().unwrap();
    b.connect().unwrap();

    a.move_absolute_um(5000.0).unwrap();
    b.move_absolute(5.0).unwrap();
    sim_a.finish_motion();
    sim_b.finish_motion();

    assert_eq!(a.position().unwrap(), b.position().unwrap());
    assert_eq!(a.position_um().unwrap(), 5000.0);
}

#[test]
fn test_move_fs_targets_optical_delay() {
    let (stage, sim) = simulated_stage();
    stage.connect().unwrap();

    let target_fs = 10_000.0;
    stage.move_absolute_fs(target_fs).unwrap();
    sim.finish_motion();

    assert_close(stage.position_fs().unwrap(), target_fs, 1e-6);
    assert_close(stage.position().unwrap(), 1.49896229, 1e-8);
}

#[test]
fn test_disconnect_from_any_state() {
    let (stage, sim) = simulated_stage();
    stage.connect().unwrap();
    stage.move_absolute(30.0).unwrap();
    assert_eq!(stage.state(), DeviceState::Moving);

    stage.disconnect().unwrap();
    assert_eq!(stage.state(), DeviceState::Disconnected);
    assert!(!sim.is_connected());

    sim.fail_next_connect();
    assert_eq!(stage.connect().unwrap(), DeviceState::Faulted);
    stage.disconnect().unwrap();
    assert_eq!(stage.state(), DeviceState::Disconnected);
}

#[test]
fn test_connect_error_faults() {
    let (stage, driver) = mock_stage();
    driver.fail_on("connect");
    assert_eq!(stage.connect().unwrap(), DeviceState::Faulted);
    // 驱动仍可查询错误，返回驱动文本
    assert_eq!(stage.last_error(), "7: connect rejected");
}

#[test]
fn test_connect_refused_faults() {
    let (stage, driver) = mock_stage();
    driver.refuse_connect();
    assert_eq!(stage.connect().unwrap(), DeviceState::Faulted);
    assert!(matches!(
        stage.move_absolute(1.0),
        Err(StageError::InvalidTransition { from: DeviceState::Faulted, .. })
    ));
}

#[test]
fn test_every_move_command_from_ready_yields_moving() {
    type MoveCommand = fn(&DelayStage<MockDriver>) -> Result<(), StageError>;
    let commands: [(&str, MoveCommand); 6] = [
        ("move_absolute", |s| s.move_absolute(1.0)),
        ("move_absolute_um", |s| s.move_absolute_um(1000.0)),
        ("move_absolute_fs", |s| s.move_absolute_fs(1000.0)),
        ("move_relative", |s| s.move_relative(0.5)),
        ("move_relative_um", |s| s.move_relative_um(500.0)),
        ("move_step", |s| s.move_step(-1.0)),
    ];

    for (name, command) in commands {
        let (stage, driver) = mock_stage();
        stage.connect().unwrap();
        assert_eq!(stage.state(), DeviceState::Ready);

        command(&stage).unwrap();
        assert_eq!(stage.state(), DeviceState::Moving, "{name}");
        assert!(driver.call_count() > 1, "{name} was not dispatched");
    }
}

// ==================== 拒绝与错误记录 ====================

#[test]
fn test_illegal_move_leaves_driver_untouched() {
    let (stage, driver) = mock_stage();
    for result in [
        stage.move_absolute(1.0),
        stage.move_absolute_um(1.0),
        stage.move_absolute_fs(1.0),
        stage.move_relative(1.0),
        stage.move_relative_um(1.0),
        stage.move_step(1.0),
    ] {
        let err = result.unwrap_err();
        assert!(err.is_rejection());
    }
    assert_eq!(driver.call_count(), 0);
    assert_eq!(stage.state(), DeviceState::Disconnected);
}

#[test]
fn test_driver_error_is_recorded_not_returned() {
    let (stage, sim) = simulated_stage();
    stage.connect().unwrap();

    // 超出行程：控制器错误 7
    stage.move_absolute(75.0).unwrap();
    assert_eq!(stage.state(), DeviceState::Moving);
    assert_eq!(stage.last_error(), "7: Position out of limits");
    assert!(stage.server_message().starts_with("move_absolute failed"));
    assert!(!sim.is_moving());

    // 运动未开始，下一次到位查询回到 Ready
    assert!(stage.on_target_state().unwrap());
    assert_eq!(stage.state(), DeviceState::Ready);
}

#[test]
fn test_velocity_error_keeps_state() {
    let (stage, _) = simulated_stage();
    stage.connect().unwrap();

    stage.set_velocity(100.0).unwrap();
    assert_eq!(stage.state(), DeviceState::Ready);
    assert_eq!(stage.last_error(), "17: Parameter out of range");
    assert_eq!(stage.velocity().unwrap(), 1.0);
}

#[test]
fn test_mock_driver_failure_recorded() {
    let (stage, driver) = mock_stage();
    stage.connect().unwrap();
    driver.fail_on("set_zero_position");

    stage.set_zero_position().unwrap();
    assert_eq!(stage.state(), DeviceState::Ready);
    assert_eq!(stage.last_error(), "7: set_zero_position rejected");
}

#[test]
fn test_read_error_surfaces() {
    let (stage, driver) = mock_stage();
    stage.connect().unwrap();
    driver.fail_on("position");
    assert!(matches!(stage.position_um(), Err(StageError::Driver(_))));
}

// ==================== 停止 ====================

#[test]
fn test_stop_from_moving_and_ready() {
    let (stage, driver) = mock_stage();
    stage.connect().unwrap();

    stage.move_absolute(20.0).unwrap();
    stage.stop_motion().unwrap();
    assert_eq!(stage.state(), DeviceState::Ready);

    stage.stop_motion().unwrap();
    assert_eq!(stage.state(), DeviceState::Ready);

    let stops = driver.calls().iter().filter(|c| *c == "stop_motion").count();
    assert_eq!(stops, 2);
}

#[test]
fn test_stop_from_faulted_yields_ready() {
    let (stage, driver) = mock_stage();
    driver.refuse_connect();
    stage.connect().unwrap();
    assert_eq!(stage.state(), DeviceState::Faulted);
    let calls_before = driver.call_count();

    stage.stop_motion().unwrap();
    assert_eq!(stage.state(), DeviceState::Ready);
    assert_eq!(driver.call_count(), calls_before + 1);
    assert_eq!(driver.calls().last().map(String::as_str), Some("stop_motion"));
}

#[test]
fn test_stop_from_any_state_yields_ready() {
    // Disconnected：驱动报告未连接，错误被记录
    let (stage, sim) = simulated_stage();
    stage.stop_motion().unwrap();
    assert_eq!(stage.state(), DeviceState::Ready);
    assert_eq!(stage.last_error(), "Controller not connected");
    assert!(sim.command_history().is_empty());

    // Faulted（模拟位移台）
    let (stage, sim) = simulated_stage();
    sim.fail_next_connect();
    assert_eq!(stage.connect().unwrap(), DeviceState::Faulted);
    stage.stop_motion().unwrap();
    assert_eq!(stage.state(), DeviceState::Ready);
}

// ==================== 零点与回零 ====================

#[test]
fn test_set_zero_position_does_not_move() {
    let (stage, sim) = simulated_stage();
    stage.connect().unwrap();
    stage.move_absolute(12.0).unwrap();
    sim.finish_motion();
    stage.on_target_state().unwrap();

    stage.set_zero_position().unwrap();
    assert_close(stage.position().unwrap(), 0.0, 1e-12);
    assert_close(stage.position_unshifted().unwrap(), 12.0, 1e-12);
    assert_close(stage.position_unshifted_um().unwrap(), 12_000.0, 1e-9);
    assert!(!sim.is_moving());

    // 绝对运动目标位于零点坐标系
    stage.move_absolute(-2.0).unwrap();
    sim.finish_motion();
    assert_close(stage.position_unshifted().unwrap(), 10.0, 1e-12);
}

#[test]
fn test_zero_reference_move_syncs_limits() {
    let (stage, sim) = simulated_stage();
    stage.connect().unwrap();
    stage.zero_reference_move().unwrap();

    let history = sim.command_history();
    assert_eq!(&history[1..], ["zero_reference_move", "handle_limits"]);
    assert_eq!(stage.state(), DeviceState::Ready);
}

#[test]
fn test_zero_reference_failure_skips_limits() {
    let (stage, driver) = mock_stage();
    stage.connect().unwrap();
    driver.fail_on("zero_reference_move");

    stage.zero_reference_move().unwrap();
    assert!(!driver.calls().iter().any(|c| c == "handle_limits"));
}

// ==================== 多单位视图 ====================

#[test]
fn test_bounds_in_all_units() {
    let (stage, _) = simulated_stage();
    assert_eq!(stage.position_min(), 0.0);
    assert_eq!(stage.position_max(), 50.0);
    assert_eq!(stage.position_min_um(), 0.0);
    assert_eq!(stage.position_max_um(), 50_000.0);
    assert_eq!(stage.position_min_fs(), 0.0);
    assert_eq!(stage.position_max_fs(), 50.0 / 299_792_458.0 * 1e12 * 2.0);

    // 属性表的边界与 facade 一致
    let table = attribute_table(&stage.travel_range());
    let fs = table.iter().find(|d| d.name == "position_fs").unwrap();
    assert_eq!(fs.max, Some(stage.position_max_fs()));
}

#[test]
fn test_custom_travel_range() {
    let config = SimulationConfig {
        travel_min_mm: -25.0,
        travel_max_mm: 25.0,
        ..Default::default()
    };
    let (stage, _) = simulated_stage_with_config(config);
    assert_eq!(stage.position_min_um(), -25_000.0);
    assert!(stage.position_min_fs() < 0.0);
}

#[test]
fn test_velocity_symmetry() {
    let (stage, _) = simulated_stage();
    stage.connect().unwrap();

    stage.set_velocity(2.0).unwrap();
    assert_eq!(stage.velocity_umps().unwrap(), 2000.0);

    stage.set_velocity_umps(500.0).unwrap();
    assert_eq!(stage.velocity().unwrap(), 0.5);
}

#[test]
fn test_move_relative_um() {
    let (stage, sim) = simulated_stage();
    stage.connect().unwrap();
    stage.move_absolute(1.0).unwrap();
    sim.finish_motion();

    stage.move_relative_um(-250.0).unwrap();
    sim.finish_motion();
    assert_close(stage.position_um().unwrap(), 750.0, 1e-9);
}
