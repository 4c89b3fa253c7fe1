//! 章节处理流程 - 流程层
//!
//! 核心职责：定义"一个章节"的完整发布流程
//!
//! 状态顺序：
//! 1. Idle → TitleSet：定位标题框并写入标题
//! 2. TitleSet → BodySet：等待编辑器就绪，写入正文
//! 3. BodySet → Submitted：点击发布（找不到或禁用时等待后重试一次）
//! 4. Submitted → ConfirmPending：轮询等待确认按钮出现
//! 5. ConfirmPending → Confirmed：点击确认（不再验证点击效果）
//!
//! 任意非终态都可能转入 Failed。确认之后由编排器决定是否调用 `advance`
//! 新建下一章节。

use std::fmt::Display;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BatchConfig;
use crate::error::{AdvanceFailure, ItemError};
use crate::infrastructure::{sleep_cancellable, wait_until, WaitOutcome};
use crate::models::{ContentParser, Item};
use crate::progress::{EventSink, ProgressEvent};
use crate::surface::{ControlQuery, SurfaceAdapter, SurfaceProbe};
use crate::utils::logging::truncate_text;
use crate::workflow::item_ctx::ItemCtx;

/// 发布按钮最多尝试的次数（首次 + 一次重试）
const PUBLISH_ATTEMPTS: usize = 2;

/// 流水线状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    TitleSet,
    BodySet,
    Submitted,
    ConfirmPending,
    Confirmed,
    Failed(ItemError),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Confirmed | PipelineState::Failed(_))
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "待开始"),
            PipelineState::TitleSet => write!(f, "标题已填写"),
            PipelineState::BodySet => write!(f, "正文已填写"),
            PipelineState::Submitted => write!(f, "已点击发布"),
            PipelineState::ConfirmPending => write!(f, "确认按钮已出现"),
            PipelineState::Confirmed => write!(f, "已确认发布"),
            PipelineState::Failed(e) => write!(f, "失败({})", e),
        }
    }
}

/// 章节处理流程
///
/// - 不持有任何资源，只借用适配器、解析器与进度输出
/// - 所有等待都通过条件轮询器完成，并受取消令牌约束
pub struct ItemFlow<'a> {
    surface: &'a dyn SurfaceAdapter,
    parser: &'a dyn ContentParser,
    sink: &'a dyn EventSink,
    config: &'a BatchConfig,
    cancel: CancellationToken,
}

impl<'a> ItemFlow<'a> {
    pub fn new(
        surface: &'a dyn SurfaceAdapter,
        parser: &'a dyn ContentParser,
        sink: &'a dyn EventSink,
        config: &'a BatchConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            surface,
            parser,
            sink,
            config,
            cancel,
        }
    }

    /// 把一个章节从 Idle 推进到终态
    ///
    /// 每次状态转换（包括转入 Failed）都会发出一个 `Transition` 事件。
    pub async fn run(&self, item: &Item, ctx: &ItemCtx) -> Result<(), ItemError> {
        let content = self
            .parser
            .parse(item, self.config.use_item_name_as_title);
        info!("{} 标题: {}", ctx, truncate_text(&content.title, 60));
        debug!(
            "{} 正文: {} 字符, {} 行",
            ctx,
            content.body.chars().count(),
            content.body.lines().count()
        );

        let mut state = PipelineState::Idle;
        while !state.is_terminal() {
            let step = match state {
                PipelineState::Idle => self
                    .fill_title(ctx, &content.title)
                    .await
                    .map(|_| PipelineState::TitleSet),
                PipelineState::TitleSet => self
                    .fill_body(ctx, &content.body)
                    .await
                    .map(|_| PipelineState::BodySet),
                PipelineState::BodySet => {
                    self.submit(ctx).await.map(|_| PipelineState::Submitted)
                }
                PipelineState::Submitted => self
                    .await_confirm()
                    .await
                    .map(|_| PipelineState::ConfirmPending),
                PipelineState::ConfirmPending => {
                    self.confirm(ctx).await;
                    Ok(PipelineState::Confirmed)
                }
                PipelineState::Confirmed | PipelineState::Failed(_) => break,
            };

            let next = match &step {
                Ok(next) => next.clone(),
                Err(e) => PipelineState::Failed(e.clone()),
            };
            self.sink.emit(&ProgressEvent::Transition {
                ordinal: ctx.ordinal,
                from: state,
                to: next.clone(),
            });
            step?;
            state = next;
        }

        Ok(())
    }

    /// 新建下一章节并等待其编辑器就绪
    ///
    /// 按钮不存在、点击无效、新编辑器未就绪都归为 `AdvanceSequenceFailed`。
    pub async fn advance(&self, ctx: &ItemCtx) -> Result<(), ItemError> {
        self.sink.emit(&ProgressEvent::AdvanceStarted {
            ordinal: ctx.ordinal,
        });

        let timings = &self.config.timings;
        let next_query = ControlQuery::create_next(&self.config.labels);
        let next_present = SurfaceProbe::ControlPresent(next_query.clone());

        let appeared = self
            .wait_for_probe(&next_present, timings.next_control_timeout_ms)
            .await;
        match appeared {
            WaitOutcome::Satisfied { .. } => {}
            WaitOutcome::TimedOut => return Err(advance_failed(AdvanceFailure::ControlAbsent)),
            WaitOutcome::Cancelled => return Err(ItemError::Aborted),
        }

        let handle = self
            .surface
            .find_control(&next_query)
            .await
            .ok_or_else(|| advance_failed(AdvanceFailure::ControlAbsent))?;
        if !handle.enabled {
            return Err(advance_failed(AdvanceFailure::ControlInert));
        }
        if let Err(e) = self.surface.click(&handle).await {
            warn!("{} \"新建章节\"点击失败: {}", ctx, e);
            return Err(advance_failed(AdvanceFailure::ControlInert));
        }

        // 按钮消失且新编辑器可用，才算进入了新的章节
        let surface = self.surface;
        let next_probe = &next_present;
        let ready = wait_until(
            move || async move {
                !surface.surface_indicates_state(next_probe).await
                    && surface
                        .surface_indicates_state(&SurfaceProbe::EditorReady)
                        .await
            },
            Duration::from_millis(timings.next_editor_timeout_ms),
            timings.poll_interval(),
            &self.cancel,
        )
        .await;

        match ready {
            WaitOutcome::Satisfied { elapsed } => {
                debug!("{} 新章节就绪, 耗时 {:?}", ctx, elapsed);
                self.sink.emit(&ProgressEvent::AdvanceCompleted {
                    ordinal: ctx.ordinal,
                });
                Ok(())
            }
            WaitOutcome::Cancelled => Err(ItemError::Aborted),
            WaitOutcome::TimedOut => {
                let cause = if self.surface.surface_indicates_state(&next_present).await {
                    AdvanceFailure::ControlInert
                } else {
                    AdvanceFailure::EditorNotReady
                };
                Err(advance_failed(cause))
            }
        }
    }

    // ========== 各步骤 ==========

    async fn fill_title(&self, ctx: &ItemCtx, title: &str) -> Result<(), ItemError> {
        let handle = self
            .surface
            .locate_title_field()
            .await
            .ok_or(ItemError::FieldNotFound)?;

        self.surface
            .set_title_value(&handle, title)
            .await
            .map_err(|e| {
                warn!("{} 标题写入失败: {}", ctx, e);
                ItemError::TitleWriteFailed
            })
    }

    async fn fill_body(&self, ctx: &ItemCtx, body: &str) -> Result<(), ItemError> {
        let timeout_ms = self.config.timings.editor_ready_timeout_ms;
        match self
            .wait_for_probe(&SurfaceProbe::EditorReady, timeout_ms)
            .await
        {
            WaitOutcome::Satisfied { .. } => {}
            WaitOutcome::TimedOut => return Err(ItemError::EditorNotReady { timeout_ms }),
            WaitOutcome::Cancelled => return Err(ItemError::Aborted),
        }

        // 等待期间页面可能重新渲染，这里重新定位
        let handle = self
            .surface
            .locate_editor_surface()
            .await
            .ok_or(ItemError::EditorNotReady { timeout_ms })?;
        if !self.surface.editor_ready(&handle).await {
            return Err(ItemError::EditorNotReady { timeout_ms });
        }

        self.surface
            .set_body_content(&handle, body)
            .await
            .map_err(|e| {
                warn!("{} 正文写入失败: {}", ctx, e);
                ItemError::BodyWriteFailed
            })
    }

    async fn submit(&self, ctx: &ItemCtx) -> Result<(), ItemError> {
        let timings = &self.config.timings;
        if !sleep_cancellable(Duration::from_millis(timings.settle_after_fill_ms), &self.cancel)
            .await
        {
            return Err(ItemError::Aborted);
        }

        let query = ControlQuery::publish(&self.config.labels);
        for attempt in 1..=PUBLISH_ATTEMPTS {
            match self.surface.find_control(&query).await {
                Some(handle) if handle.enabled => match self.surface.click(&handle).await {
                    Ok(()) => {
                        info!("{} 📤 已点击发布", ctx);
                        return Ok(());
                    }
                    Err(e) => {
                        warn!("{} 发布按钮点击失败 (第 {} 次): {}", ctx, attempt, e)
                    }
                },
                Some(_) => warn!("{} 发布按钮处于禁用状态 (第 {} 次)", ctx, attempt),
                None => warn!("{} 未找到发布按钮 (第 {} 次)", ctx, attempt),
            }

            if attempt < PUBLISH_ATTEMPTS
                && !sleep_cancellable(
                    Duration::from_millis(timings.publish_retry_delay_ms),
                    &self.cancel,
                )
                .await
            {
                return Err(ItemError::Aborted);
            }
        }

        Err(ItemError::PublishControlNotFound)
    }

    async fn await_confirm(&self) -> Result<(), ItemError> {
        let timeout_ms = self.config.timings.confirm_timeout_ms;
        let probe = SurfaceProbe::ControlPresent(ControlQuery::confirm(&self.config.labels));
        match self.wait_for_probe(&probe, timeout_ms).await {
            WaitOutcome::Satisfied { .. } => Ok(()),
            WaitOutcome::TimedOut => Err(ItemError::ConfirmNeverAppeared { timeout_ms }),
            WaitOutcome::Cancelled => Err(ItemError::Aborted),
        }
    }

    /// 点击确认；页面没有可靠的确认完成信号，点击结果只记录不影响状态
    async fn confirm(&self, ctx: &ItemCtx) {
        let query = ControlQuery::confirm(&self.config.labels);
        match self.surface.find_control(&query).await {
            Some(handle) => {
                if let Err(e) = self.surface.click(&handle).await {
                    warn!("{} 确认按钮点击失败，按已确认处理: {}", ctx, e);
                }
            }
            None => warn!("{} 确认按钮已消失，按已确认处理", ctx),
        }
    }

    async fn wait_for_probe(&self, probe: &SurfaceProbe, timeout_ms: u64) -> WaitOutcome {
        let surface = self.surface;
        wait_until(
            move || surface.surface_indicates_state(probe),
            Duration::from_millis(timeout_ms),
            self.config.timings.poll_interval(),
            &self.cancel,
        )
        .await
    }
}

fn advance_failed(cause: AdvanceFailure) -> ItemError {
    ItemError::AdvanceSequenceFailed(cause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChapterParser;
    use crate::progress::ChannelSink;
    use crate::surface::{AdvanceFault, MockFaults, MockSurface};
    use std::collections::{HashMap, HashSet};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn drain(rx: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn transitions(events: &[ProgressEvent]) -> Vec<PipelineState> {
        events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Transition { to, .. } => Some(to.clone()),
                _ => None,
            })
            .collect()
    }

    async fn run_one(
        surface: &MockSurface,
        config: &BatchConfig,
    ) -> (Result<(), ItemError>, Vec<ProgressEvent>) {
        let (sink, mut rx) = ChannelSink::new();
        let flow = ItemFlow::new(
            surface,
            &ChapterParser,
            &sink,
            config,
            CancellationToken::new(),
        );
        let item = Item::new(0, "001.txt", "第1章 开端\n第一行\n第二行");
        let ctx = ItemCtx::new(&item, 2);
        let result = flow.run(&item, &ctx).await;
        (result, drain(&mut rx))
    }

    #[tokio::test]
    async fn happy_path_walks_every_state() {
        let surface = MockSurface::new();
        let (result, events) = run_one(&surface, &BatchConfig::immediate()).await;

        tokio_test::assert_ok!(result);
        assert_eq!(
            transitions(&events),
            vec![
                PipelineState::TitleSet,
                PipelineState::BodySet,
                PipelineState::Submitted,
                PipelineState::ConfirmPending,
                PipelineState::Confirmed,
            ]
        );
        let published = surface.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].title, "第1章 开端");
        assert_eq!(published[0].body, "第一行\n第二行");
    }

    #[tokio::test]
    async fn missing_title_field_fails_first_transition() {
        let surface = MockSurface::with_faults(MockFaults {
            title_missing: HashSet::from([0]),
            ..Default::default()
        });
        let (result, events) = run_one(&surface, &BatchConfig::immediate()).await;

        assert_eq!(result, Err(ItemError::FieldNotFound));
        assert_eq!(
            transitions(&events),
            vec![PipelineState::Failed(ItemError::FieldNotFound)]
        );
    }

    #[tokio::test]
    async fn rejected_title_is_title_write_failure() {
        let surface = MockSurface::with_faults(MockFaults {
            title_rejected: HashSet::from([0]),
            ..Default::default()
        });
        let (result, _) = run_one(&surface, &BatchConfig::immediate()).await;
        assert_eq!(result, Err(ItemError::TitleWriteFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn editor_never_ready_times_out() {
        let surface = MockSurface::with_faults(MockFaults {
            editor_never_ready: HashSet::from([0]),
            ..Default::default()
        });
        let config = BatchConfig::immediate();
        let (result, events) = run_one(&surface, &config).await;

        let expected = ItemError::EditorNotReady {
            timeout_ms: config.timings.editor_ready_timeout_ms,
        };
        assert_eq!(result, Err(expected.clone()));
        assert_eq!(
            transitions(&events),
            vec![PipelineState::TitleSet, PipelineState::Failed(expected)]
        );
        assert_eq!(surface.call_count("set_body_content"), 0);
    }

    #[tokio::test]
    async fn body_fallback_strategy_is_enough() {
        let surface = MockSurface::with_faults(MockFaults {
            body_primary_fails: HashSet::from([0]),
            ..Default::default()
        });
        let (result, _) = run_one(&surface, &BatchConfig::immediate()).await;
        tokio_test::assert_ok!(result);
        assert_eq!(surface.body_strategies_used(), vec![1]);
    }

    #[tokio::test]
    async fn body_rejected_by_all_strategies() {
        let surface = MockSurface::with_faults(MockFaults {
            body_rejected: HashSet::from([0]),
            ..Default::default()
        });
        let (result, _) = run_one(&surface, &BatchConfig::immediate()).await;
        assert_eq!(result, Err(ItemError::BodyWriteFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn publish_is_retried_exactly_once() {
        let surface = MockSurface::with_faults(MockFaults {
            publish_missing_lookups: HashMap::from([(0, 1)]),
            ..Default::default()
        });
        let mut config = BatchConfig::immediate();
        config.timings.publish_retry_delay_ms = 300;

        let started = tokio::time::Instant::now();
        let (result, _) = run_one(&surface, &config).await;
        tokio_test::assert_ok!(result);
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(surface.call_count("find_control:PUBLISH"), 2);
    }

    #[tokio::test]
    async fn publish_missing_twice_fails() {
        let surface = MockSurface::with_faults(MockFaults {
            publish_missing_lookups: HashMap::from([(0, 5)]),
            ..Default::default()
        });
        let (result, _) = run_one(&surface, &BatchConfig::immediate()).await;
        assert_eq!(result, Err(ItemError::PublishControlNotFound));
        assert_eq!(surface.call_count("find_control:PUBLISH"), PUBLISH_ATTEMPTS);
    }

    #[tokio::test]
    async fn disabled_publish_counts_as_not_found() {
        let surface = MockSurface::with_faults(MockFaults {
            publish_disabled: HashSet::from([0]),
            ..Default::default()
        });
        let (result, _) = run_one(&surface, &BatchConfig::immediate()).await;
        assert_eq!(result, Err(ItemError::PublishControlNotFound));
        assert_eq!(surface.call_count("click"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_that_appears_late_is_awaited() {
        let surface = MockSurface::new().confirm_after_probes(3);
        let (result, _) = run_one(&surface, &BatchConfig::immediate()).await;
        tokio_test::assert_ok!(result);
        assert_eq!(surface.published().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_never_appearing_fails_item() {
        let surface = MockSurface::with_faults(MockFaults {
            confirm_never: HashSet::from([0]),
            ..Default::default()
        });
        let config = BatchConfig::immediate();
        let (result, events) = run_one(&surface, &config).await;
        assert_eq!(
            result,
            Err(ItemError::ConfirmNeverAppeared {
                timeout_ms: config.timings.confirm_timeout_ms
            })
        );
        assert_eq!(transitions(&events).len(), 4);
        assert!(surface.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_aborts_item() {
        let surface = MockSurface::with_faults(MockFaults {
            confirm_never: HashSet::from([0]),
            ..Default::default()
        });
        let mut config = BatchConfig::immediate();
        config.timings.confirm_timeout_ms = 60_000;

        let (sink, _rx) = ChannelSink::new();
        let cancel = CancellationToken::new();
        let flow = ItemFlow::new(&surface, &ChapterParser, &sink, &config, cancel.clone());
        let item = Item::new(0, "a.txt", "正文");
        let ctx = ItemCtx::new(&item, 1);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        assert_eq!(flow.run(&item, &ctx).await, Err(ItemError::Aborted));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    async fn advance_with(
        fault: Option<AdvanceFault>,
    ) -> (Result<(), ItemError>, Vec<ProgressEvent>) {
        let faults = MockFaults {
            advance: fault.map(|f| HashMap::from([(0, f)])).unwrap_or_default(),
            ..Default::default()
        };
        let surface = MockSurface::with_faults(faults);
        let config = BatchConfig::immediate();
        let (sink, mut rx) = ChannelSink::new();
        let flow = ItemFlow::new(
            &surface,
            &ChapterParser,
            &sink,
            &config,
            CancellationToken::new(),
        );
        let item = Item::new(0, "a.txt", "第1章\n正文");
        let ctx = ItemCtx::new(&item, 2);

        flow.run(&item, &ctx).await.unwrap();
        let result = flow.advance(&ctx).await;
        (result, drain(&mut rx))
    }

    #[tokio::test(start_paused = true)]
    async fn advance_succeeds_on_healthy_surface() {
        let (result, events) = advance_with(None).await;
        tokio_test::assert_ok!(result);
        assert!(events.contains(&ProgressEvent::AdvanceCompleted { ordinal: 0 }));
    }

    #[tokio::test(start_paused = true)]
    async fn advance_failure_causes_are_distinguished() {
        for (fault, cause) in [
            (AdvanceFault::ControlAbsent, AdvanceFailure::ControlAbsent),
            (AdvanceFault::ControlInert, AdvanceFailure::ControlInert),
            (AdvanceFault::EditorStuck, AdvanceFailure::EditorNotReady),
        ] {
            let (result, events) = advance_with(Some(fault)).await;
            assert_eq!(
                result,
                Err(ItemError::AdvanceSequenceFailed(cause)),
                "{:?}",
                fault
            );
            assert!(!events.contains(&ProgressEvent::AdvanceCompleted { ordinal: 0 }));
        }
    }
}
