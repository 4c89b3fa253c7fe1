//! 输入条目与解析后的内容

use std::fmt::Display;

/// 一个输入条目（一个章节文件）
///
/// 批次被接受时一次性创建，之后不再修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    ordinal: usize,
    name: String,
    content: String,
}

impl Item {
    /// 创建条目
    ///
    /// # 参数
    /// - `ordinal`: 在批次中的位置（从 0 开始）
    /// - `name`: 文件名
    /// - `content`: 原始文本
    pub fn new(ordinal: usize, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            ordinal,
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// 以新的序号复制一份，用于重新提交
    pub fn renumbered(&self, ordinal: usize) -> Self {
        Self {
            ordinal,
            ..self.clone()
        }
    }
}

impl Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.ordinal + 1, self.name)
    }
}

/// 从条目文本解析出的标题与正文，只在处理该条目期间存在
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContent {
    pub title: String,
    pub body: String,
}

/// 按顺序生成一个批次的条目
pub fn items_from<N, C>(entries: impl IntoIterator<Item = (N, C)>) -> Vec<Item>
where
    N: Into<String>,
    C: Into<String>,
{
    entries
        .into_iter()
        .enumerate()
        .map(|(ordinal, (name, content))| Item::new(ordinal, name, content))
        .collect()
}
