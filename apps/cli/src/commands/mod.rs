//! 命令定义和实现

pub mod attributes;
pub mod config;

pub use config::ConfigCommand;
