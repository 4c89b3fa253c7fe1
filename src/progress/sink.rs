//! 进度输出
//!
//! 引擎只管发送，从不等待、从不重试；任何输出失败都在这里吞掉。

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::progress::event::ProgressEvent;

/// 进度事件接收方
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// 输出到 tracing 日志
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Transition { .. } if !event.is_failure() => debug!("{}", event),
            ProgressEvent::BatchHalted { .. } if event.is_failure() => error!("{}", event),
            ProgressEvent::BatchHalted { .. } => warn!("{}", event),
            _ if event.is_failure() => warn!("{}", event),
            _ => info!("{}", event),
        }
    }
}

/// 转发到 tokio 通道，供界面或测试消费
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &ProgressEvent) {
        // 接收端已关闭时直接丢弃
        let _ = self.tx.send(event.clone());
    }
}

/// 追加写入日志文件
///
/// 文件在第一次写入时打开并一直持有，之后每个事件只是一次追加写；
/// 打开失败时丢弃该事件，下一个事件再尝试打开。
#[derive(Debug)]
pub struct LogFileSink {
    path: String,
    file: Mutex<Option<LineWriter<File>>>,
}

impl LogFileSink {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let writer = match guard.take() {
            Some(writer) => writer,
            None => LineWriter::new(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?,
            ),
        };
        let writer = guard.insert(writer);
        writeln!(writer, "{} {}", Local::now().format("%Y-%m-%d %H:%M:%S"), line)
    }
}

impl EventSink for LogFileSink {
    fn emit(&self, event: &ProgressEvent) {
        if let Err(e) = self.append(&event.to_string()) {
            debug!("写入日志文件 {} 失败: {}", self.path, e);
        }
    }
}

/// 同时发给多个接收方
#[derive(Default, Clone)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl CompositeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }
}

impl EventSink for CompositeSink {
    fn emit(&self, event: &ProgressEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
