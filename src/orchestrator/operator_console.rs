//! 操作员控制台
//!
//! 从标准输入读取命令并转交给 `BatchControl`；Ctrl+C 等同于停止，
//! 第二次 Ctrl+C 等同于中止。

use std::io::BufRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::orchestrator::control::BatchControl;

/// 控制台命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Pause,
    Resume,
    Stop,
    Abort,
    Status,
}

impl OperatorCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Some(Self::Pause),
            "r" | "resume" => Some(Self::Resume),
            "s" | "stop" => Some(Self::Stop),
            "a" | "abort" => Some(Self::Abort),
            "?" | "status" => Some(Self::Status),
            _ => None,
        }
    }

    /// 执行命令，返回是否被接受
    pub fn apply(self, control: &BatchControl) -> bool {
        match self {
            Self::Pause => control.pause(),
            Self::Resume => control.resume(),
            Self::Stop => control.request_stop(),
            Self::Abort => control.abort(),
            Self::Status => {
                let summary = control.current_progress().summary();
                info!(
                    "📊 当前进度: 成功 {}, 失败 {}, 未处理 {} / 共 {}",
                    summary.succeeded, summary.failed, summary.pending, summary.total
                );
                true
            }
        }
    }
}

/// 启动后台任务监听标准输入
///
/// 标准输入在独立线程上阻塞读取，按行转发给异步任务。tokio 的 stdin 读取无法取消，
/// 会让运行时退出时一直等待回车；独立线程不被等待，进程结束时随之退出。
pub fn spawn_stdin_console(control: BatchControl) -> JoinHandle<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let reader = std::thread::Builder::new()
        .name("operator-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = reader {
        warn!("无法启动控制台输入线程，控制台命令不可用: {}", e);
    }
    tokio::spawn(run_console(rx, control))
}

/// 逐行执行控制台命令，输入端关闭时结束
pub async fn run_console(mut lines: mpsc::UnboundedReceiver<String>, control: BatchControl) {
    while let Some(line) = lines.recv().await {
        match OperatorCommand::parse(&line) {
            Some(command) => {
                if command.apply(&control) {
                    info!("🎛️ 已执行命令: {:?}", command);
                } else {
                    info!("🎛️ 命令 {:?} 当前无效", command);
                }
            }
            None if line.trim().is_empty() => {}
            None => warn!("未知命令: {}（可用: p / r / s / a / ?）", line.trim()),
        }
    }
}

/// 启动后台任务监听 Ctrl+C
pub fn spawn_ctrl_c_handler(control: BatchControl) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("🛑 收到 Ctrl+C，当前章节完成后停止（再次按下立即中止）");
        control.request_stop();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 立即中止");
            control.abort();
        }
    })
}
