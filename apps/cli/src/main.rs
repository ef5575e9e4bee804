//! # pistage CLI
//!
//! PI 线性延迟台的命令行工具。
//!
//! ## 交互式 Shell
//!
//! ```bash
//! $ pistage-cli shell 117018374
//! pistage> connect
//! pistage> move_absolute_um 5000
//! pistage> read on_target_state
//! pistage> read position_fs
//! pistage> exit
//! ```
//!
//! Shell 使用模拟位移台作为驱动；硬件链路（串口/USB、GCS 协议）不在本工具范围内。
//!
//! ## 其他命令
//!
//! ```bash
//! pistage-cli attributes          # 打印属性表
//! pistage-cli config show         # 打印生效的配置
//! pistage-cli config path         # 打印配置文件路径
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pistage_client::{CommandDispatcher, DelayStageBuilder};
use pistage_driver::{DiagnosticLayer, DiagnosticSink, SimulatedStage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;
mod config;
mod modes;

use commands::ConfigCommand;
use commands::attributes::print_attributes;
use config::ServerConfig;
use modes::repl::run_shell;

/// pistage CLI - PI 延迟台命令行工具
#[derive(Parser, Debug)]
#[command(name = "pistage-cli")]
#[command(about = "Command-line shell for the PI delay stage facade", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/pistage/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 启动交互式 Shell
    Shell {
        /// 控制器序列号（覆盖配置文件中的 controller）
        controller: Option<String>,
    },

    /// 打印属性表
    Attributes,

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(cli.config.as_deref()),

        Commands::Attributes => {
            let config = load_config(&cli.config)?;
            print_attributes(&config.simulation.travel_range());
            Ok(())
        },

        Commands::Shell { controller } => {
            let config = load_config(&cli.config)?;
            let controller = controller
                .or_else(|| config.controller.clone())
                .context("缺少控制器序列号：请在命令行或配置文件中指定 controller")?;

            let sink = DiagnosticSink::new();
            init_tracing(&config.log_filter, sink.clone())?;

            let driver = SimulatedStage::new(controller.clone(), config.simulation.clone(), sink.clone());
            let stage = DelayStageBuilder::new(controller.as_str())
                .move_step_size_um(config.move_step_size_um)
                .diagnostics(sink)
                .build(driver);
            info!(controller = %controller, "Delay stage ready (simulated driver)");

            let dispatcher = Arc::new(CommandDispatcher::new(Arc::new(stage)));
            run_shell(dispatcher).await
        },
    }
}

fn load_config(explicit: &Option<PathBuf>) -> Result<ServerConfig> {
    let path = ServerConfig::resolve_path(explicit.as_deref())?;
    ServerConfig::load(&path)
}

/// 初始化日志：fmt 输出到 stderr，同时把最近一条消息写入诊断槽位
fn init_tracing(filter: &str, sink: DiagnosticSink) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter).with_context(|| format!("无效的日志过滤规则: {filter}"))?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(DiagnosticLayer::new(sink))
        .try_init()
        .context("初始化日志失败")?;
    Ok(())
}
