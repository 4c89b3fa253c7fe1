//! 批次状态
//!
//! 由编排器独占修改；对外只提供快照。

use std::fmt::Display;
use std::sync::Arc;

use crate::error::ItemError;
use crate::models::item::Item;

/// 单个条目的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Pending,
    InProgress,
    Success,
    Failed(ItemError),
}

impl ItemOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemOutcome::Success | ItemOutcome::Failed(_))
    }
}

impl Display for ItemOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemOutcome::Pending => write!(f, "等待中"),
            ItemOutcome::InProgress => write!(f, "处理中"),
            ItemOutcome::Success => write!(f, "成功"),
            ItemOutcome::Failed(reason) => write!(f, "失败: {}", reason),
        }
    }
}

/// 批次提前结束的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// 操作员请求停止
    StopRequested,
    /// 操作员中止（打断了正在进行的等待）
    Aborted,
    /// 切换下一章节失败，页面状态未知，无法安全继续
    AdvanceFailed(ItemError),
}

impl Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::StopRequested => write!(f, "操作员请求停止"),
            HaltReason::Aborted => write!(f, "操作员中止"),
            HaltReason::AdvanceFailed(e) => write!(f, "{}", e),
        }
    }
}

/// 批次统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub pending: usize,
}

/// 批次状态快照
#[derive(Debug, Clone, Default)]
pub struct BatchState {
    pub items: Arc<Vec<Item>>,
    /// 按条目序号索引
    pub outcomes: Vec<ItemOutcome>,
    /// 下一个未处理条目的位置，只增不减
    pub cursor: usize,
    pub running: bool,
    pub stop_requested: bool,
    pub paused: bool,
    /// 提前结束的原因；正常跑完为 None
    pub halt: Option<HaltReason>,
}

impl BatchState {
    /// 接受一个新批次，所有条目处于 Pending
    ///
    /// 条目按在批次中的位置重新编号，结果与游标都以这个位置为准。
    pub fn new(items: Vec<Item>) -> Self {
        let items: Vec<Item> = items
            .into_iter()
            .enumerate()
            .map(|(position, item)| {
                if item.ordinal() == position {
                    item
                } else {
                    item.renumbered(position)
                }
            })
            .collect();
        let outcomes = vec![ItemOutcome::Pending; items.len()];
        Self {
            items: Arc::new(items),
            outcomes,
            ..Default::default()
        }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn outcome(&self, ordinal: usize) -> Option<&ItemOutcome> {
        self.outcomes.get(ordinal)
    }

    pub fn terminal_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_terminal()).count()
    }

    pub fn in_progress_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::InProgress))
            .count()
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.total(),
            ..Default::default()
        };
        for outcome in &self.outcomes {
            match outcome {
                ItemOutcome::Success => summary.succeeded += 1,
                ItemOutcome::Failed(_) => summary.failed += 1,
                ItemOutcome::Pending | ItemOutcome::InProgress => summary.pending += 1,
            }
        }
        summary
    }

    /// 失败的条目及原因
    pub fn failures(&self) -> Vec<(&Item, &ItemError)> {
        self.items
            .iter()
            .zip(&self.outcomes)
            .filter_map(|(item, outcome)| match outcome {
                ItemOutcome::Failed(reason) => Some((item, reason)),
                _ => None,
            })
            .collect()
    }

    /// 失败条目重新编号后组成的新批次，用于重新提交
    pub fn failed_items(&self) -> Vec<Item> {
        self.failures()
            .into_iter()
            .enumerate()
            .map(|(ordinal, (item, _))| item.renumbered(ordinal))
            .collect()
    }

    pub(crate) fn mark_in_progress(&mut self, ordinal: usize) {
        if let Some(slot) = self.outcomes.get_mut(ordinal) {
            *slot = ItemOutcome::InProgress;
        }
    }

    /// 记录终态结果并推进游标
    pub(crate) fn record(&mut self, ordinal: usize, outcome: ItemOutcome) {
        debug_assert!(outcome.is_terminal());
        debug_assert_eq!(ordinal, self.cursor);
        if let Some(slot) = self.outcomes.get_mut(ordinal) {
            *slot = outcome;
            self.cursor = ordinal + 1;
        }
    }
}
