//! 批次编排器 - 编排层
//!
//! ## 职责
//!
//! 按输入顺序逐个驱动章节流程，记录每个章节的结果，响应操作员的
//! 暂停 / 停止 / 中止，并把进度输出给 `EventSink`。
//!
//! ## 规则
//!
//! - 同一时刻只处理一个章节（页面只有一个标题框、一个编辑器）
//! - 单个章节失败不影响后续章节
//! - "新建下一章节"失败时页面状态未知，整个批次停止，其余章节保持 Pending
//! - 停止请求只在检查点生效：每个章节开始前，以及新建下一章节之前

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::BatchConfig;
use crate::error::{BatchError, ItemError};
use crate::infrastructure::sleep_cancellable;
use crate::models::{BatchState, ChapterParser, ContentParser, HaltReason, Item, ItemOutcome};
use crate::orchestrator::control::BatchControl;
use crate::progress::{EventSink, ProgressEvent};
use crate::surface::SurfaceAdapter;
use crate::utils::logging;
use crate::workflow::{ItemCtx, ItemFlow};

/// 批次编排器
pub struct BatchOrchestrator {
    surface: Arc<dyn SurfaceAdapter>,
    parser: Arc<dyn ContentParser>,
    sink: Arc<dyn EventSink>,
    control: BatchControl,
}

impl BatchOrchestrator {
    pub fn new(surface: Arc<dyn SurfaceAdapter>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            surface,
            parser: Arc::new(ChapterParser),
            sink,
            control: BatchControl::new(),
        }
    }

    /// 替换标题解析器
    pub fn with_parser(mut self, parser: Arc<dyn ContentParser>) -> Self {
        self.parser = parser;
        self
    }

    /// 获取可克隆的控制句柄
    pub fn control(&self) -> BatchControl {
        self.control.clone()
    }

    pub fn request_stop(&self) -> bool {
        self.control.request_stop()
    }

    pub fn current_progress(&self) -> BatchState {
        self.control.current_progress()
    }

    /// 处理一个批次，直到全部完成或提前停止
    ///
    /// # 返回
    /// 批次结束时的状态快照；已有批次在运行时返回 `BatchError::AlreadyRunning`
    pub async fn start(
        &self,
        items: Vec<Item>,
        config: &BatchConfig,
    ) -> Result<BatchState, BatchError> {
        let cancel = self
            .control
            .try_begin(BatchState::new(items))
            .ok_or(BatchError::AlreadyRunning)?;

        let items = self.control.current_progress().items;
        let total = items.len();
        logging::log_batch_start(total, self.surface.name());
        self.sink.emit(&ProgressEvent::BatchStarted { total });

        let flow = ItemFlow::new(
            self.surface.as_ref(),
            self.parser.as_ref(),
            self.sink.as_ref(),
            config,
            cancel.clone(),
        );

        let mut halt = None;
        for item in items.iter() {
            if let Some(reason) = self.checkpoint(&cancel).await {
                halt = Some(reason);
                break;
            }

            let ctx = ItemCtx::new(item, total);
            logging::log_item_start(&ctx);
            self.control.update(|s| s.mark_in_progress(ctx.ordinal));
            self.sink.emit(&ProgressEvent::ItemStarted {
                ordinal: ctx.ordinal,
                total,
                name: ctx.name.clone(),
            });

            let result = flow.run(item, &ctx).await;
            let outcome = match &result {
                Ok(()) => ItemOutcome::Success,
                Err(e) => ItemOutcome::Failed(e.clone()),
            };
            self.control
                .update(|s| s.record(ctx.ordinal, outcome.clone()));
            self.sink.emit(&ProgressEvent::ItemFinished {
                ordinal: ctx.ordinal,
                name: ctx.name.clone(),
                outcome,
            });

            match result {
                Err(e) if e.is_batch_fatal() => {
                    halt = Some(halt_reason(e));
                    break;
                }
                // 失败的章节不新建下一章节，下一个章节直接在当前页面上填写
                Err(_) => continue,
                Ok(()) if !ctx.has_next() => continue,
                Ok(()) => {}
            }

            if !sleep_cancellable(config.inter_item_delay(), &cancel).await {
                halt = Some(HaltReason::Aborted);
                break;
            }
            if self.control.stop_requested() {
                halt = Some(stop_reason(&cancel));
                break;
            }
            if let Err(e) = flow.advance(&ctx).await {
                warn!("{} 新建下一章节失败，停止批次: {}", ctx, e);
                halt = Some(halt_reason(e));
                break;
            }
        }

        self.finish(halt);
        Ok(self.control.current_progress())
    }

    /// 章节开始前的检查点：处理暂停，返回需要停止的原因
    async fn checkpoint(&self, cancel: &CancellationToken) -> Option<HaltReason> {
        if cancel.is_cancelled() {
            return Some(HaltReason::Aborted);
        }

        let mut rx = self.control.subscribe();
        let (paused, cursor) = {
            let state = rx.borrow_and_update();
            (state.paused && !state.stop_requested, state.cursor)
        };

        if paused {
            info!("⏸️ 批次已暂停，等待继续...");
            self.sink.emit(&ProgressEvent::Paused { cursor });
            tokio::select! {
                _ = cancel.cancelled() => return Some(HaltReason::Aborted),
                changed = rx.wait_for(|s| !s.paused || s.stop_requested) => {
                    if changed.is_err() {
                        return Some(HaltReason::StopRequested);
                    }
                }
            }
            if !self.control.stop_requested() {
                info!("▶️ 批次继续");
                self.sink.emit(&ProgressEvent::Resumed { cursor });
            }
        }

        self.control
            .stop_requested()
            .then(|| stop_reason(cancel))
    }

    fn finish(&self, halt: Option<HaltReason>) {
        self.control.update(|s| {
            s.running = false;
            s.paused = false;
            s.halt = halt.clone();
        });

        let state = self.control.current_progress();
        let summary = state.summary();
        match halt {
            Some(reason) => {
                warn!("⛔ 批次提前结束: {}", reason);
                self.sink.emit(&ProgressEvent::BatchHalted {
                    reason,
                    cursor: state.cursor,
                    total: state.total(),
                });
            }
            None => {
                self.sink.emit(&ProgressEvent::BatchCompleted { summary });
            }
        }
        logging::log_batch_complete(&summary);
    }
}

fn stop_reason(cancel: &CancellationToken) -> HaltReason {
    if cancel.is_cancelled() {
        HaltReason::Aborted
    } else {
        HaltReason::StopRequested
    }
}

fn halt_reason(error: ItemError) -> HaltReason {
    match error {
        ItemError::Aborted => HaltReason::Aborted,
        other => HaltReason::AdvanceFailed(other),
    }
}
