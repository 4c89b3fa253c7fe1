use anyhow::{Context, Result};
/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::fs;
use tracing::info;

use crate::config::Config;
use crate::models::BatchSummary;
use crate::workflow::ItemCtx;

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n章节发布日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法初始化日志文件: {}", log_file_path))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 章节批量发布");
    info!("🌐 浏览器调试端口: {}", config.browser_debug_port);
    info!("📁 章节目录: {}", config.input_folder);
    info!(
        "⏱️ 章节间隔: {}ms, 使用文件名作为标题: {}",
        config.batch.delay_between_items_ms, config.batch.use_item_name_as_title
    );
    info!("{}", "=".repeat(60));
}

/// 记录章节加载信息
pub fn log_items_loaded(total: usize) {
    info!("✓ 找到 {} 个待发布的章节", total);
    info!("💡 控制台输入 p 暂停 / r 继续 / s 停止 / a 中止\n");
}

/// 记录批次开始信息
pub fn log_batch_start(total: usize, surface_name: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理批次: 共 {} 个章节 (页面: {})", total, surface_name);
    info!("{}", "=".repeat(60));
}

/// 记录章节开始信息
pub fn log_item_start(ctx: &ItemCtx) {
    info!("\n[章节 {}] {}", ctx.index(), "─".repeat(30));
    info!(
        "[章节 {}] 处理第 {}/{} 个章节: {}",
        ctx.index(),
        ctx.index(),
        ctx.total,
        ctx.name
    );
}

/// 记录批次完成信息
pub fn log_batch_complete(summary: &BatchSummary) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 批次结束: 成功 {}/{}, 失败 {}, 未处理 {}",
        summary.succeeded, summary.total, summary.failed, summary.pending
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &BatchSummary, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.succeeded, summary.total);
    info!("❌ 失败: {}", summary.failed);
    info!("⏳ 未处理: {}", summary.pending);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
