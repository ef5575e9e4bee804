//! Mock 驱动
//!
//! 记录每一次调用，可按方法注入失败。与模拟位移台不同，它不建模运动，
//! on-target 读数由测试直接设置。

use parking_lot::Mutex;
use pistage_driver::driver::Result;
use pistage_driver::{DriverError, StageDriver, TravelRange};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Mock 驱动内部状态
#[derive(Debug, Default)]
pub struct MockDriverState {
    pub calls: Vec<String>,
    pub failing: HashSet<&'static str>,
    pub connect_accepts: bool,
    pub on_target: bool,
    pub position: f64,
    pub velocity: f64,
    pub last_error: String,
}

/// 可克隆的 Mock 驱动句柄
#[derive(Debug, Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockDriverState>>,
    range: TravelRange,
}

impl MockDriver {
    pub fn new(range: TravelRange) -> Self {
        let state = MockDriverState {
            connect_accepts: true,
            velocity: 1.0,
            last_error: "0: No error".to_string(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            range,
        }
    }

    /// 让指定方法返回控制器错误
    pub fn fail_on(&self, method: &'static str) {
        self.state.lock().failing.insert(method);
    }

    pub fn refuse_connect(&self) {
        self.state.lock().connect_accepts = false;
    }

    pub fn simulate_on_target(&self, on_target: bool) {
        self.state.lock().on_target = on_target;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    fn call(&self, method: &'static str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(method.to_string());
        if state.failing.contains(method) {
            state.last_error = format!("7: {method} rejected");
            return Err(DriverError::Controller {
                code: 7,
                message: format!("{method} rejected"),
            });
        }
        Ok(())
    }
}

impl StageDriver for MockDriver {
    fn connect(&mut self) -> Result<bool> {
        self.call("connect")?;
        Ok(self.state.lock().connect_accepts)
    }

    fn disconnect(&mut self) -> Result<()> {
        self.call("disconnect")
    }

    fn position(&mut self) -> Result<f64> {
        self.call("position")?;
        Ok(self.state.lock().position)
    }

    fn position_unshifted(&mut self) -> Result<f64> {
        self.call("position_unshifted")?;
        Ok(self.state.lock().position)
    }

    fn move_absolute(&mut self, target: f64) -> Result<()> {
        self.call("move_absolute")?;
        let mut state = self.state.lock();
        state.position = target;
        state.on_target = false;
        Ok(())
    }

    fn move_relative(&mut self, delta: f64) -> Result<()> {
        self.call("move_relative")?;
        let mut state = self.state.lock();
        state.position += delta;
        state.on_target = false;
        Ok(())
    }

    fn on_target(&mut self) -> Result<bool> {
        self.call("on_target")?;
        Ok(self.state.lock().on_target)
    }

    fn set_zero_position(&mut self) -> Result<()> {
        self.call("set_zero_position")
    }

    fn stop_motion(&mut self) -> Result<()> {
        self.call("stop_motion")
    }

    fn zero_reference_move(&mut self) -> Result<()> {
        self.call("zero_reference_move")
    }

    fn handle_limits(&mut self) -> Result<()> {
        self.call("handle_limits")
    }

    fn velocity(&mut self) -> Result<f64> {
        self.call("velocity")?;
        Ok(self.state.lock().velocity)
    }

    fn set_velocity(&mut self, velocity: f64) -> Result<()> {
        self.call("set_velocity")?;
        self.state.lock().velocity = velocity;
        Ok(())
    }

    fn last_error(&mut self) -> Result<String> {
        self.call("last_error")?;
        Ok(self.state.lock().last_error.clone())
    }

    fn travel_range(&self) -> TravelRange {
        self.range
    }
}

/// 让 `on_target` 变慢的包装驱动，其余调用原样转发
///
/// 用于在到位查询进行中插入并发命令。
#[derive(Clone)]
pub struct SlowOnTarget<D> {
    pub inner: D,
    pub delay: Duration,
}

impl<D: StageDriver> StageDriver for SlowOnTarget<D> {
    fn connect(&mut self) -> Result<bool> {
        self.inner.connect()
    }

    fn disconnect(&mut self) -> Result<()> {
        self.inner.disconnect()
    }

    fn position(&mut self) -> Result<f64> {
        self.inner.position()
    }

    fn position_unshifted(&mut self) -> Result<f64> {
        self.inner.position_unshifted()
    }

    fn move_absolute(&mut self, target: f64) -> Result<()> {
        self.inner.move_absolute(target)
    }

    fn move_relative(&mut self, delta: f64) -> Result<()> {
        self.inner.move_relative(delta)
    }

    fn on_target(&mut self) -> Result<bool> {
        let on_target = self.inner.on_target()?;
        std::thread::sleep(self.delay);
        Ok(on_target)
    }

    fn set_zero_position(&mut self) -> Result<()> {
        self.inner.set_zero_position()
    }

    fn stop_motion(&mut self) -> Result<()> {
        self.inner.stop_motion()
    }

    fn zero_reference_move(&mut self) -> Result<()> {
        self.inner.zero_reference_move()
    }

    fn handle_limits(&mut self) -> Result<()> {
        self.inner.handle_limits()
    }

    fn velocity(&mut self) -> Result<f64> {
        self.inner.velocity()
    }

    fn set_velocity(&mut self, velocity: f64) -> Result<()> {
        self.inner.set_velocity(velocity)
    }

    fn last_error(&mut self) -> Result<String> {
        self.inner.last_error()
    }

    fn travel_range(&self) -> TravelRange {
        self.inner.travel_range()
    }
}
