//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：日志文件、连接浏览器、创建页面适配器和进度输出
//! 2. **加载章节**：扫描章节目录，按文件名排序
//! 3. **运行批次**：交给 `BatchOrchestrator`，同时挂上控制台和 Ctrl+C
//! 4. **收尾**：打印统计，把失败章节写入 failed.txt
//!
//! 唯一持有 Browser 的模块。

use anyhow::Result;
use chromiumoxide::Browser;
use std::sync::Arc;
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::{load_items_from_folder, BatchState};
use crate::orchestrator::batch_orchestrator::BatchOrchestrator;
use crate::orchestrator::operator_console::{spawn_ctrl_c_handler, spawn_stdin_console};
use crate::progress::{CompositeSink, LogFileSink, TracingSink};
use crate::services::FailureWriter;
use crate::surface::PageSurface;
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    orchestrator: BatchOrchestrator,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(&config);

        let target_url = (!config.target_url.is_empty()).then_some(config.target_url.as_str());
        let (browser, page) =
            browser::connect_to_browser_and_page(config.browser_debug_port, target_url, None)
                .await?;

        let surface = PageSurface::new(JsExecutor::new(page));
        let mut sink = CompositeSink::new().with(LogFileSink::new(&config.output_log_file));
        if config.verbose_logging {
            sink = sink.with(TracingSink);
        }
        let orchestrator = BatchOrchestrator::new(Arc::new(surface), Arc::new(sink));

        Ok(Self {
            config,
            _browser: browser,
            orchestrator,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<BatchState> {
        let items = load_items_from_folder(&self.config.input_folder).await?;
        if items.is_empty() {
            warn!("⚠️ 没有找到待发布的章节文件，程序结束");
            return Ok(BatchState::default());
        }
        logging::log_items_loaded(items.len());

        let control = self.orchestrator.control();
        let console = spawn_stdin_console(control.clone());
        let ctrl_c = spawn_ctrl_c_handler(control);

        let result = self.orchestrator.start(items, &self.config.batch).await;
        console.abort();
        ctrl_c.abort();
        let state = result?;

        let summary = state.summary();
        logging::print_final_stats(&summary, &self.config.output_log_file);

        if summary.failed > 0 {
            let writer = FailureWriter::with_path(&self.config.failed_list_file);
            let written = writer.write_batch(&state)?;
            info!("📝 {} 个失败章节已写入: {}", written, writer.path());
        }
        if let Some(reason) = &state.halt {
            warn!(
                "⛔ 批次提前结束（{}），已处理 {}/{}",
                reason,
                state.cursor,
                state.total()
            );
        }

        Ok(state)
    }
}
