//! 交互式 Shell
//!
//! 专用输入线程 + crossbeam 通道：rustyline 在独立线程中阻塞读取，
//! 保留历史记录，不阻塞 tokio。
//!
//! Shell 命令直接映射到属性/命令接口：
//!
//! ```text
//! pistage> connect
//! pistage> read position_um
//! pistage> write velocity_umps 2000
//! pistage> move_absolute_um 5000
//! pistage> status
//! pistage> exit
//! ```
//!
//! Ctrl+C 不退出 Shell，而是执行 `stop_motion`。

use anyhow::Result;
use crossbeam_channel::{Receiver, bounded};
use pistage_client::{AttributeValue, Command, CommandDispatcher, StageError};
use pistage_driver::StageDriver;
use rustyline::Editor;
use std::sync::Arc;
use std::thread;

use crate::commands::attributes::render_table;

/// 输入线程收到 Ctrl+C 时发送的标记
const INTERRUPT: &str = "\u{3}";

/// 一行 Shell 输入解析后的动作
#[derive(Debug, Clone, PartialEq)]
pub enum ShellAction {
    /// 读取属性
    Read(String),
    /// 写入属性（原始文本，按属性类型解析）
    Write(String, String),
    /// 执行命令
    Execute(Command, Option<f64>),
    /// 列出属性
    Attributes,
    /// 显示状态
    Status,
    /// 显示帮助
    Help,
    /// 退出
    Exit,
}

/// 解析一行输入
pub fn parse_line(line: &str) -> Result<ShellAction> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = parts.split_first() else {
        anyhow::bail!("空命令");
    };

    let action = match (head, args) {
        ("exit" | "quit", []) => ShellAction::Exit,
        ("help", []) => ShellAction::Help,
        ("status", []) => ShellAction::Status,
        ("attrs", []) => ShellAction::Attributes,
        ("read", [name]) => ShellAction::Read(name.to_string()),
        ("read", _) => anyhow::bail!("用法: read <attribute>"),
        ("write", [name, value]) => ShellAction::Write(name.to_string(), value.to_string()),
        ("write", _) => anyhow::bail!("用法: write <attribute> <value>"),
        (name, args) => {
            let command: Command = name.parse()?;
            let argument = match args {
                [] => None,
                [value] => Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| anyhow::anyhow!("无效的数值参数: {value}"))?,
                ),
                _ => anyhow::bail!("{command} 最多接受一个参数"),
            };
            ShellAction::Execute(command, argument)
        },
    };
    Ok(action)
}

/// Shell 会话
pub struct ShellSession<D: StageDriver> {
    dispatcher: Arc<CommandDispatcher<D>>,
}

impl<D: StageDriver> ShellSession<D> {
    /// 创建会话
    pub fn new(dispatcher: Arc<CommandDispatcher<D>>) -> Self {
        Self { dispatcher }
    }

    /// 执行一个动作，返回要打印的文本
    pub fn run(&self, action: ShellAction) -> Result<String, StageError> {
        match action {
            ShellAction::Read(name) => Ok(self.dispatcher.read(&name)?.to_string()),

            ShellAction::Write(name, text) => {
                let data_type = self
                    .dispatcher
                    .attributes()
                    .iter()
                    .find(|d| d.name == name)
                    .map(|d| d.data_type)
                    .ok_or_else(|| StageError::UnknownAttribute(name.clone()))?;
                let value = AttributeValue::parse(data_type, &text).ok_or_else(|| {
                    StageError::TypeMismatch {
                        name: name.clone(),
                        expected: data_type,
                    }
                })?;
                self.dispatcher.write(&name, value)?;
                Ok("ok".to_string())
            },

            ShellAction::Execute(command, argument) => {
                self.dispatcher.execute(command, argument)?;
                Ok(format!("{command}: state {}", self.dispatcher.stage().state()))
            },

            ShellAction::Attributes => Ok(render_table(self.dispatcher.attributes())),

            ShellAction::Status => Ok(self.status()),

            ShellAction::Help => Ok(help_text()),

            ShellAction::Exit => Ok(String::new()),
        }
    }

    /// Ctrl+C：停止运动
    pub fn interrupt(&self) {
        stop_motion(&self.dispatcher);
    }

    fn status(&self) -> String {
        let stage = self.dispatcher.stage();
        let position = match stage.position_um() {
            Ok(um) => format!("{um:.3} um"),
            Err(_) => "-".to_string(),
        };
        format!(
            "controller {} | state {} | position {} | last message: {}",
            stage.controller_serial(),
            stage.state(),
            position,
            stage.server_message()
        )
    }
}

fn stop_motion<D: StageDriver>(dispatcher: &CommandDispatcher<D>) {
    match dispatcher.execute(Command::StopMotion, None) {
        Ok(()) => eprintln!("🛑 stop_motion 已发送"),
        Err(e) => eprintln!("❌ stop_motion 失败: {e}"),
    }
}

fn help_text() -> String {
    let mut text = String::from(
        "可用命令:\n\
         \x20 read <attribute>              读取属性\n\
         \x20 write <attribute> <value>     写入属性（cmd_* 属性写入即执行命令）\n\
         \x20 attrs                         列出属性\n\
         \x20 status                        显示状态\n\
         \x20 help                          显示帮助\n\
         \x20 exit / quit                   退出\n\
         \n\
         设备命令:\n",
    );
    for command in Command::ALL {
        let usage = match command.argument_unit() {
            Some(unit) => format!("{command} <{unit}>"),
            None => command.to_string(),
        };
        text.push_str(&format!("  {usage}\n"));
    }
    text.push_str("\n快捷键:\n  Ctrl+C                        停止运动\n  Ctrl+D                        退出\n");
    text
}

/// Shell 输入（专用输入线程）
pub struct ShellInput {
    command_rx: Receiver<String>,
    _input_thread: thread::JoinHandle<Result<()>>,
}

impl ShellInput {
    /// 创建专用输入线程（保留历史记录）
    pub fn new(controller: &str) -> Self {
        let (command_tx, command_rx) = bounded::<String>(10);
        let banner = format!(
            "pistage-cli v{} - 控制器 {}",
            env!("CARGO_PKG_VERSION"),
            controller
        );

        let input_thread = thread::spawn(move || {
            use rustyline::history::DefaultHistory;

            let mut rl = Editor::<(), DefaultHistory>::new()
                .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {}", e))?;

            let history_path = ".pistage_history";
            rl.load_history(history_path).ok(); // 首次运行没有历史文件

            println!("{banner}");
            println!("输入 'help' 查看帮助，'exit' 退出");
            println!();

            loop {
                match rl.readline("pistage> ") {
                    Ok(line) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }

                        let _ = rl.add_history_entry(line.clone());
                        let exit = line == "exit" || line == "quit";
                        if command_tx.send(line).is_err() || exit {
                            break;
                        }
                    },

                    Err(rustyline::error::ReadlineError::Interrupted) => {
                        // Ctrl+C 交给主循环处理
                        if command_tx.send(INTERRUPT.to_string()).is_err() {
                            break;
                        }
                    },

                    Err(rustyline::error::ReadlineError::Eof) => {
                        let _ = command_tx.send("exit".to_string());
                        break;
                    },

                    Err(err) => {
                        eprintln!("Error: {:?}", err);
                        break;
                    },
                }
            }

            rl.save_history(history_path).ok();
            Ok(())
        });

        Self {
            command_rx,
            _input_thread: input_thread,
        }
    }

    /// 等待用户输入（在 tokio 任务中使用）
    pub async fn recv_command(&self) -> Option<String> {
        let rx = self.command_rx.clone();
        tokio::task::spawn_blocking(move || rx.recv())
            .await
            .ok()
            .and_then(|result| result.ok())
    }
}

/// 运行交互式 Shell
pub async fn run_shell<D: StageDriver + 'static>(
    dispatcher: Arc<CommandDispatcher<D>>,
) -> Result<()> {
    let controller = dispatcher.stage().controller_serial().to_string();
    let session = ShellSession::new(dispatcher.clone());
    let input = ShellInput::new(&controller);

    // 后台任务：输入线程之外收到的 Ctrl+C 同样执行停止
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            stop_motion(&dispatcher);
        }
    });

    while let Some(line) = input.recv_command().await {
        if line == INTERRUPT {
            session.interrupt();
            continue;
        }

        let action = match parse_line(&line) {
            Ok(action) => action,
            Err(e) => {
                eprintln!("❌ {e}");
                continue;
            },
        };

        if action == ShellAction::Exit {
            break;
        }

        match session.run(action) {
            Ok(output) => println!("{output}"),
            Err(e) if e.is_rejection() => eprintln!("⚠️  {e}"),
            Err(e) => eprintln!("❌ {e}"),
        }
    }

    // 退出前断开
    if let Err(e) = session.run(ShellAction::Execute(Command::Disconnect, None)) {
        eprintln!("❌ {e}");
    }
    println!("👋 再见！");
    Ok(())
}
