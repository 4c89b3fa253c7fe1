//! 进度事件
//!
//! 引擎向外输出的唯一信息流，`Display` 即给操作员看的文字。

use std::fmt::Display;

use crate::models::{BatchSummary, HaltReason, ItemOutcome};
use crate::workflow::PipelineState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    BatchStarted {
        total: usize,
    },
    ItemStarted {
        ordinal: usize,
        total: usize,
        name: String,
    },
    /// 流水线的一次状态转换，失败也是一次转换
    Transition {
        ordinal: usize,
        from: PipelineState,
        to: PipelineState,
    },
    ItemFinished {
        ordinal: usize,
        name: String,
        outcome: ItemOutcome,
    },
    AdvanceStarted {
        ordinal: usize,
    },
    AdvanceCompleted {
        ordinal: usize,
    },
    Paused {
        cursor: usize,
    },
    Resumed {
        cursor: usize,
    },
    /// 批次提前结束，与单个章节失败区分开
    BatchHalted {
        reason: HaltReason,
        cursor: usize,
        total: usize,
    },
    BatchCompleted {
        summary: BatchSummary,
    },
}

impl ProgressEvent {
    /// 是否属于失败类事件
    pub fn is_failure(&self) -> bool {
        match self {
            ProgressEvent::ItemFinished { outcome, .. } => {
                matches!(outcome, ItemOutcome::Failed(_))
            }
            ProgressEvent::Transition { to, .. } => matches!(to, PipelineState::Failed(_)),
            ProgressEvent::BatchHalted { reason, .. } => {
                matches!(reason, HaltReason::AdvanceFailed(_))
            }
            _ => false,
        }
    }
}

impl Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressEvent::BatchStarted { total } => {
                write!(f, "🚀 开始发布 {} 个章节", total)
            }
            ProgressEvent::ItemStarted {
                ordinal,
                total,
                name,
            } => write!(
                f,
                "[章节 {}] 开始处理第 {}/{} 个: {}",
                ordinal + 1,
                ordinal + 1,
                total,
                name
            ),
            ProgressEvent::Transition { ordinal, from, to } => {
                write!(f, "[章节 {}] {} → {}", ordinal + 1, from, to)
            }
            ProgressEvent::ItemFinished {
                ordinal,
                name,
                outcome,
            } => match outcome {
                ItemOutcome::Success => {
                    write!(f, "[章节 {}] ✅ 发布成功: {}", ordinal + 1, name)
                }
                ItemOutcome::Failed(reason) => {
                    write!(f, "[章节 {}] ❌ 处理失败: {} ({})", ordinal + 1, name, reason)
                }
                other => write!(f, "[章节 {}] {}: {}", ordinal + 1, other, name),
            },
            ProgressEvent::AdvanceStarted { ordinal } => {
                write!(f, "[章节 {}] ➡️ 正在新建下一章节", ordinal + 1)
            }
            ProgressEvent::AdvanceCompleted { ordinal } => {
                write!(f, "[章节 {}] ✓ 下一章节编辑器已就绪", ordinal + 1)
            }
            ProgressEvent::Paused { cursor } => {
                write!(f, "⏸️ 已暂停，下一个为第 {} 个", cursor + 1)
            }
            ProgressEvent::Resumed { cursor } => {
                write!(f, "▶️ 继续处理，从第 {} 个开始", cursor + 1)
            }
            ProgressEvent::BatchHalted {
                reason,
                cursor,
                total,
            } => write!(
                f,
                "⛔ 批次已停止: {}（已处理 {}/{}，其余章节未处理）",
                reason, cursor, total
            ),
            ProgressEvent::BatchCompleted { summary } => write!(
                f,
                "📊 批次完成: 成功 {}, 失败 {}, 未处理 {}, 共 {}",
                summary.succeeded, summary.failed, summary.pending, summary.total
            ),
        }
    }
}
