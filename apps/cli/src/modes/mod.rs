//! 运行模式
//!
//! - Shell 模式：交互式读写属性、执行命令

pub mod repl;
