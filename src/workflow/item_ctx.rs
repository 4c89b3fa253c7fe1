//! 章节处理上下文
//!
//! 封装"我正在处理这一批中的第几个章节"这一信息

use std::fmt::Display;

use crate::models::Item;

/// 章节处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 在批次中的位置（从 0 开始）
    pub ordinal: usize,
    /// 批次总数
    pub total: usize,
    /// 文件名
    pub name: String,
}

impl ItemCtx {
    pub fn new(item: &Item, total: usize) -> Self {
        Self {
            ordinal: item.ordinal(),
            total,
            name: item.name().to_string(),
        }
    }

    /// 日志显示用的序号（从 1 开始）
    pub fn index(&self) -> usize {
        self.ordinal + 1
    }

    /// 后面是否还有章节
    pub fn has_next(&self) -> bool {
        self.ordinal + 1 < self.total
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[章节 {}/{} {}]", self.index(), self.total, self.name)
    }
}
