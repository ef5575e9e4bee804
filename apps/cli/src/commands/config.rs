//! 配置管理命令

use crate::config::ServerConfig;
use anyhow::Result;
use clap::Subcommand;
use std::path::Path;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示生效的配置（TOML）
    Show,

    /// 显示配置文件路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self, explicit_path: Option<&Path>) -> Result<()> {
        let path = ServerConfig::resolve_path(explicit_path)?;

        match self {
            ConfigCommand::Show => {
                let config = ServerConfig::load(&path)?;
                if !path.exists() {
                    println!("# {} 不存在，使用默认配置", path.display());
                }
                print!("{}", config.to_toml()?);
            },

            ConfigCommand::Path => {
                println!("{}", path.display());
            },
        }

        Ok(())
    }
}
