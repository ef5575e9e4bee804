//! 诊断消息捕获
//!
//! 单槽存储：只保留最近一条诊断文本，供远程查询（`server_message` 属性）。
//!
//! # 线程安全
//!
//! 槽位使用 `ArcSwap` 整体替换：驱动的诊断输出与外部查询可以并发进行，
//! 读者只会看到某一条完整消息，不会读到拼接或截断的内容。
//!
//! # 注入方式
//!
//! [`DiagnosticSink`] 是可克隆的句柄，克隆共享同一个槽位。
//! 需要输出诊断的组件（模拟位移台、facade）在构造时接收一个句柄；
//! 进程级的 tracing 输出可通过 [`DiagnosticLayer`] 接入同一个槽位。
//!
//! ```rust
//! use pistage_driver::DiagnosticSink;
//!
//! let sink = DiagnosticSink::new();
//! assert_eq!(sink.peek(), "");
//!
//! sink.record("x");
//! sink.record("y");
//! assert_eq!(sink.peek(), "y");
//! ```

use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// `emit()` 产生的 tracing 事件使用的 target
pub const DIAGNOSTICS_TARGET: &str = "pistage::diagnostics";

/// 最近一条诊断消息的单槽存储
#[derive(Clone, Default)]
pub struct DiagnosticSink {
    slot: Arc<ArcSwap<String>>,
}

impl DiagnosticSink {
    /// 创建空槽位
    pub fn new() -> Self {
        Self::default()
    }

    /// 覆盖槽位内容
    pub fn record(&self, text: impl Into<String>) {
        self.slot.store(Arc::new(text.into()));
    }

    /// 读取当前内容（从未写入时为空字符串）
    pub fn peek(&self) -> String {
        (**self.slot.load()).clone()
    }

    /// 记录并同时输出一条 info 级日志
    pub fn emit(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(target: DIAGNOSTICS_TARGET, "{}", text);
        self.record(text);
    }
}

impl fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticSink")
            .field("last", &self.peek())
            .finish()
    }
}

/// 把 tracing 事件的 `message` 字段写入 [`DiagnosticSink`] 的 Layer
///
/// 替代"重定向标准输出、保存最后一行"的做法：日志照常输出，
/// 同时最近一条满足级别要求的消息可以被远程读取。
///
/// ```rust
/// use pistage_driver::{DiagnosticLayer, DiagnosticSink};
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let sink = DiagnosticSink::new();
/// let subscriber = tracing_subscriber::registry().with(DiagnosticLayer::new(sink.clone()));
///
/// tracing::subscriber::with_default(subscriber, || {
///     tracing::warn!("servo off");
/// });
/// assert_eq!(sink.peek(), "servo off");
/// ```
pub struct DiagnosticLayer {
    sink: DiagnosticSink,
    max_level: Level,
}

impl DiagnosticLayer {
    /// 捕获 INFO 及以上级别
    pub fn new(sink: DiagnosticSink) -> Self {
        Self {
            sink,
            max_level: Level::INFO,
        }
    }

    /// 设置捕获的最详细级别（例如 `Level::DEBUG` 也会捕获 debug 事件）
    pub fn with_max_level(mut self, level: Level) -> Self {
        self.max_level = level;
        self
    }
}

impl<S: Subscriber> Layer<S> for DiagnosticLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.max_level {
            return;
        }
        // emit() 已经写过槽位
        if metadata.target() == DIAGNOSTICS_TARGET {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        if let Some(message) = visitor.message {
            self.sink.record(message);
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_peek_empty_by_default() {
        let sink = DiagnosticSink::new();
        assert_eq!(sink.peek(), "");
    }

    #[test]
    fn test_record_overwrites() {
        let sink = DiagnosticSink::new();
        sink.record("x");
        sink.record("y");
        assert_eq!(sink.peek(), "y");
    }

    #[test]
    fn test_clone_shares_slot() {
        let sink = DiagnosticSink::new();
        let handle = sink.clone();
        handle.record("from driver");
        assert_eq!(sink.peek(), "from driver");
    }

    /// 并发写入时读者只能看到完整的某一条消息
    #[test]
    fn test_concurrent_record_no_tearing() {
        let sink = DiagnosticSink::new();
        let candidates: Vec<String> = (0..4).map(|i| format!("writer-{i}-").repeat(64)).collect();

        let writers: Vec<_> = candidates
            .iter()
            .cloned()
            .map(|text| {
                let sink = sink.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        sink.record(text.clone());
                    }
                })
            })
            .collect();

        for _ in 0..1000 {
            let seen = sink.peek();
            assert!(seen.is_empty() || candidates.contains(&seen));
        }

        for writer in writers {
            writer.join().unwrap();
        }
        assert!(candidates.contains(&sink.peek()));
    }

    #[test]
    fn test_layer_captures_message() {
        let sink = DiagnosticSink::new();
        let subscriber = tracing_subscriber::registry().with(DiagnosticLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("reference move done");
            tracing::warn!(code = 7, "position out of limits: {:.1} mm", 60.0);
        });

        assert_eq!(sink.peek(), "position out of limits: 60.0 mm");
    }

    #[test]
    fn test_layer_respects_level() {
        let sink = DiagnosticSink::new();
        let subscriber = tracing_subscriber::registry().with(DiagnosticLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("kept");
            tracing::debug!("dropped");
        });
        assert_eq!(sink.peek(), "kept");

        let verbose = DiagnosticSink::new();
        let subscriber = tracing_subscriber::registry()
            .with(DiagnosticLayer::new(verbose.clone()).with_max_level(Level::DEBUG));
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("debug line");
        });
        assert_eq!(verbose.peek(), "debug line");
    }

    #[test]
    fn test_emit_records_once() {
        let sink = DiagnosticSink::new();
        let subscriber = tracing_subscriber::registry().with(DiagnosticLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            sink.emit("connected");
        });
        assert_eq!(sink.peek(), "connected");
    }
}
