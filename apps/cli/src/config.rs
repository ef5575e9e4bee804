//! 配置文件
//!
//! 默认路径：`<config_dir>/pistage/config.toml`。文件不存在时使用默认值。
//!
//! ```toml
//! controller = "117018374"
//! log_filter = "pistage=info"
//! move_step_size_um = 1.0
//!
//! [simulation]
//! travel_min_mm = 0.0
//! travel_max_mm = 50.0
//! velocity_mm_per_s = 1.0
//! max_velocity_mm_per_s = 10.0
//! ```

use anyhow::{Context, Result};
use pistage_driver::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认日志过滤规则
pub const DEFAULT_LOG_FILTER: &str = "pistage=info";

/// 服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 默认控制器序列号（命令行参数优先）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    /// tracing 过滤规则（`RUST_LOG` 优先）
    pub log_filter: String,

    /// 初始步进大小（µm）
    pub move_step_size_um: f64,

    /// 模拟位移台参数
    pub simulation: SimulationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            controller: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            move_step_size_um: 1.0,
            simulation: SimulationConfig::default(),
        }
    }
}

impl ServerConfig {
    /// 默认配置文件路径
    pub fn default_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir().context("无法确定配置目录")?;
        path.push("pistage");
        path.push("config.toml");
        Ok(path)
    }

    /// 解析配置文件路径（`--config` 优先）
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path(),
        }
    }

    /// 从文件加载；文件不存在时返回默认配置
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("配置文件格式错误: {}", path.display()))
    }

    /// 解析 TOML 文本
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if sim.travel_min_mm >= sim.travel_max_mm {
            anyhow::bail!(
                "simulation.travel_min_mm ({}) 必须小于 travel_max_mm ({})",
                sim.travel_min_mm,
                sim.travel_max_mm
            );
        }
        if !(self.move_step_size_um.is_finite() && self.move_step_size_um > 0.0) {
            anyhow::bail!("move_step_size_um 必须为正数: {}", self.move_step_size_um);
        }
        Ok(())
    }
}
