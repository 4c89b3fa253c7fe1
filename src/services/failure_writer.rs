//! 失败记录服务
//!
//! 只负责"写 failed.txt"能力，不关心流程

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

use crate::error::AppError;
use crate::models::BatchState;

/// 失败章节写入服务
///
/// 每行一条：`序号 | 文件名 | 原因`，序号从 1 开始
pub struct FailureWriter {
    failed_file_path: String,
}

impl FailureWriter {
    pub fn new() -> Self {
        Self {
            failed_file_path: "failed.txt".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            failed_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.failed_file_path
    }

    /// 写入单个失败章节
    pub fn write(&self, index: usize, name: &str, reason: &str) -> Result<()> {
        debug!("写入失败记录: 章节 {} | {}", index, name);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.failed_file_path)
            .with_context(|| format!("无法打开失败记录文件: {}", self.failed_file_path))?;

        writeln!(file, "{} | {} | {}", index, name, reason)
            .map_err(|e| AppError::file_write_failed(&self.failed_file_path, e))?;
        Ok(())
    }

    /// 写入批次中所有失败的章节，返回写入条数
    pub fn write_batch(&self, state: &BatchState) -> Result<usize> {
        let failures = state.failures();
        for (item, reason) in &failures {
            self.write(item.ordinal() + 1, item.name(), &reason.to_string())?;
        }
        Ok(failures.len())
    }
}

impl Default for FailureWriter {
    fn default() -> Self {
        Self::new()
    }
}
