use chapter_publish::browser::connect_to_browser_and_page;
use chapter_publish::config::{BatchConfig, Config};
use chapter_publish::error::{AdvanceFailure, BatchError, ItemError};
use chapter_publish::logger;
use chapter_publish::models::{items_from, BatchState, HaltReason, Item, ItemOutcome};
use chapter_publish::orchestrator::{BatchControl, BatchOrchestrator};
use chapter_publish::progress::{ChannelSink, EventSink, ProgressEvent};
use chapter_publish::surface::{AdvanceFault, MockFaults, MockSurface};
use chapter_publish::workflow::PipelineState;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_test::{assert_err, assert_ok};

type Action = Box<dyn Fn(&ProgressEvent, &BatchControl) + Send + Sync>;

/// 转发事件，并在收到事件时对批次执行操作（模拟操作员）
struct OperatorHook {
    control: OnceLock<BatchControl>,
    action: Action,
    forward: ChannelSink,
}

impl EventSink for OperatorHook {
    fn emit(&self, event: &ProgressEvent) {
        if let Some(control) = self.control.get() {
            (self.action)(event, control);
        }
        self.forward.emit(event);
    }
}

struct Harness {
    orchestrator: BatchOrchestrator,
    surface: Arc<MockSurface>,
    events: UnboundedReceiver<ProgressEvent>,
}

impl Harness {
    fn new(surface: MockSurface) -> Self {
        Self::with_operator(surface, |_, _| {})
    }

    fn with_operator(
        surface: MockSurface,
        action: impl Fn(&ProgressEvent, &BatchControl) + Send + Sync + 'static,
    ) -> Self {
        let surface = Arc::new(surface);
        let (forward, events) = ChannelSink::new();
        let hook = Arc::new(OperatorHook {
            control: OnceLock::new(),
            action: Box::new(action),
            forward,
        });
        let orchestrator = BatchOrchestrator::new(surface.clone(), hook.clone());
        let _ = hook.control.set(orchestrator.control());
        Self {
            orchestrator,
            surface,
            events,
        }
    }

    fn drain(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

fn chapters(n: usize) -> Vec<Item> {
    items_from((1..=n).map(|i| {
        (
            format!("{:02}.txt", i),
            format!("第{}章 标题{}\n正文{}", i, i, i),
        )
    }))
}

fn assert_settled(state: &BatchState) {
    assert!(!state.running);
    assert_eq!(state.cursor, state.terminal_count());
    assert_eq!(state.in_progress_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn all_items_succeed() {
    let mut harness = Harness::new(MockSurface::new());
    let state = assert_ok!(
        harness
            .orchestrator
            .start(chapters(3), &BatchConfig::immediate())
            .await
    );

    assert_settled(&state);
    assert_eq!(state.cursor, 3);
    assert!(state.outcomes.iter().all(|o| *o == ItemOutcome::Success));
    assert_eq!(state.halt, None);

    let published = harness.surface.published();
    assert_eq!(published.len(), 3);
    assert_eq!(published[0].title, "第1章 标题1");
    assert_eq!(published[2].body, "正文3");

    // 只在两个章节之间新建章节
    assert_eq!(harness.surface.call_count("find_control:CREATE CHAPTER"), 2);
    let events = harness.drain();
    assert_eq!(events.first(), Some(&ProgressEvent::BatchStarted { total: 3 }));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::BatchCompleted { summary }) if summary.succeeded == 3
    ));
}

#[tokio::test(start_paused = true)]
async fn resubmitted_items_keep_their_batch_positions() {
    let harness = Harness::new(MockSurface::new());
    let items = vec![
        Item::new(2, "03.txt", "第3章 丙\n正文3"),
        Item::new(4, "05.txt", "第5章 戊\n正文5"),
    ];
    let state = assert_ok!(
        harness
            .orchestrator
            .start(items, &BatchConfig::immediate())
            .await
    );

    assert_settled(&state);
    assert_eq!(state.cursor, 2);
    assert_eq!(state.outcomes, vec![ItemOutcome::Success, ItemOutcome::Success]);
    assert_eq!(state.items[1].ordinal(), 1);
    // 两个章节之间仍然新建章节
    assert_eq!(harness.surface.call_count("find_control:CREATE CHAPTER"), 1);
    assert_eq!(harness.surface.published().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn editor_never_ready_fails_only_that_item() {
    let faults = MockFaults {
        editor_never_ready: [1].into(),
        ..Default::default()
    };
    let harness = Harness::new(MockSurface::with_faults(faults));
    let state = assert_ok!(
        harness
            .orchestrator
            .start(chapters(3), &BatchConfig::immediate())
            .await
    );

    assert_settled(&state);
    assert_eq!(state.outcomes[0], ItemOutcome::Success);
    assert!(matches!(
        state.outcomes[1],
        ItemOutcome::Failed(ItemError::EditorNotReady { .. })
    ));
    assert_eq!(state.outcomes[2], ItemOutcome::Success);
    assert_eq!(state.halt, None);

    let retry = state.failed_items();
    assert_eq!(retry.len(), 1);
    assert_eq!(retry[0].name(), "02.txt");
    assert_eq!(retry[0].ordinal(), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_confirmation_fails_item_and_batch_continues() {
    let faults = MockFaults {
        confirm_never: [0].into(),
        ..Default::default()
    };
    let mut harness = Harness::new(MockSurface::with_faults(faults));
    let state = assert_ok!(
        harness
            .orchestrator
            .start(chapters(2), &BatchConfig::immediate())
            .await
    );

    assert_settled(&state);
    assert!(matches!(
        state.outcomes[0],
        ItemOutcome::Failed(ItemError::ConfirmNeverAppeared { .. })
    ));
    assert_eq!(state.outcomes[1], ItemOutcome::Success);
    assert_eq!(harness.surface.published().len(), 1);

    // 失败的章节之后不新建章节
    let events = harness.drain();
    assert!(!events
        .iter()
        .any(|e| matches!(e, ProgressEvent::AdvanceStarted { ordinal: 0 })));
    assert!(events.iter().any(|e| matches!(
        e,
        ProgressEvent::Transition {
            ordinal: 0,
            from: PipelineState::Submitted,
            to: PipelineState::Failed(ItemError::ConfirmNeverAppeared { .. }),
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn advance_failure_halts_with_remaining_items_pending() {
    let faults = MockFaults {
        advance: [(0, AdvanceFault::ControlAbsent)].into(),
        ..Default::default()
    };
    let mut harness = Harness::new(MockSurface::with_faults(faults));
    let state = assert_ok!(
        harness
            .orchestrator
            .start(chapters(4), &BatchConfig::immediate())
            .await
    );

    assert_settled(&state);
    assert_eq!(state.outcomes[0], ItemOutcome::Success);
    assert!(state.outcomes[1..]
        .iter()
        .all(|o| *o == ItemOutcome::Pending));
    assert_eq!(state.cursor, 1);
    assert_eq!(
        state.halt,
        Some(HaltReason::AdvanceFailed(ItemError::AdvanceSequenceFailed(
            AdvanceFailure::ControlAbsent
        )))
    );

    let events = harness.drain();
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::BatchHalted { cursor: 1, total: 4, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn inert_next_control_is_reported_as_advance_failure() {
    let faults = MockFaults {
        advance: [(0, AdvanceFault::ControlInert)].into(),
        ..Default::default()
    };
    let harness = Harness::new(MockSurface::with_faults(faults));
    let state = assert_ok!(
        harness
            .orchestrator
            .start(chapters(2), &BatchConfig::immediate())
            .await
    );

    assert_eq!(
        state.halt,
        Some(HaltReason::AdvanceFailed(ItemError::AdvanceSequenceFailed(
            AdvanceFailure::ControlInert
        )))
    );
    assert_eq!(state.outcomes[1], ItemOutcome::Pending);
}

#[tokio::test(start_paused = true)]
async fn stop_lets_current_item_finish_then_halts() {
    let harness = Harness::with_operator(MockSurface::new(), |event, control| {
        if matches!(event, ProgressEvent::ItemStarted { ordinal: 1, .. }) {
            control.request_stop();
        }
    });
    let state = assert_ok!(
        harness
            .orchestrator
            .start(chapters(3), &BatchConfig::immediate())
            .await
    );

    assert_settled(&state);
    assert_eq!(state.outcomes[0], ItemOutcome::Success);
    assert_eq!(state.outcomes[1], ItemOutcome::Success);
    assert_eq!(state.outcomes[2], ItemOutcome::Pending);
    assert_eq!(state.halt, Some(HaltReason::StopRequested));
    // 停止在新建下一章节之前生效
    assert_eq!(harness.surface.call_count("find_control:CREATE CHAPTER"), 1);
}

#[tokio::test(start_paused = true)]
async fn items_are_processed_one_at_a_time_in_order() {
    let mut harness = Harness::new(MockSurface::new().latency(Duration::from_millis(5)));
    let state = assert_ok!(
        harness
            .orchestrator
            .start(chapters(4), &BatchConfig::immediate())
            .await
    );
    assert_settled(&state);

    let mut active: Option<usize> = None;
    let mut started = Vec::new();
    for event in harness.drain() {
        match event {
            ProgressEvent::ItemStarted { ordinal, .. } => {
                assert_eq!(active, None, "章节 {} 开始时上一个章节尚未结束", ordinal);
                active = Some(ordinal);
                started.push(ordinal);
            }
            ProgressEvent::ItemFinished { ordinal, .. } => {
                assert_eq!(active, Some(ordinal));
                active = None;
            }
            ProgressEvent::AdvanceStarted { .. } => assert_eq!(active, None),
            _ => {}
        }
    }
    assert_eq!(started, vec![0, 1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn pause_holds_before_next_item_until_resumed() {
    let mut harness = Harness::with_operator(MockSurface::new(), |event, control| {
        if matches!(event, ProgressEvent::ItemFinished { ordinal: 0, .. }) {
            control.pause();
        }
    });
    let control = harness.orchestrator.control();
    let config = BatchConfig::immediate();
    let Harness {
        orchestrator,
        events,
        ..
    } = &mut harness;

    let mut seen = Vec::new();
    let (result, ()) = tokio::join!(orchestrator.start(chapters(2), &config), async {
        while let Some(event) = events.recv().await {
            let paused = matches!(event, ProgressEvent::Paused { .. });
            let done = matches!(
                event,
                ProgressEvent::BatchCompleted { .. } | ProgressEvent::BatchHalted { .. }
            );
            seen.push(event);
            if paused {
                assert_eq!(control.current_progress().outcomes[1], ItemOutcome::Pending);
                tokio::time::sleep(Duration::from_secs(5)).await;
                assert!(control.resume());
            }
            if done {
                break;
            }
        }
    });

    let state = assert_ok!(result);
    assert_settled(&state);
    assert_eq!(state.summary().succeeded, 2);
    assert!(seen.contains(&ProgressEvent::Paused { cursor: 1 }));
    assert!(seen.contains(&ProgressEvent::Resumed { cursor: 1 }));
}

#[tokio::test(start_paused = true)]
async fn abort_cancels_the_pending_wait() {
    let faults = MockFaults {
        confirm_never: [1].into(),
        ..Default::default()
    };
    let harness = Harness::with_operator(MockSurface::with_faults(faults), |event, control| {
        if matches!(
            event,
            ProgressEvent::Transition {
                ordinal: 1,
                to: PipelineState::Submitted,
                ..
            }
        ) {
            control.abort();
        }
    });
    let mut config = BatchConfig::immediate();
    config.timings.confirm_timeout_ms = 60_000;

    let state = assert_ok!(harness.orchestrator.start(chapters(3), &config).await);

    assert_settled(&state);
    assert_eq!(state.outcomes[0], ItemOutcome::Success);
    assert_eq!(state.outcomes[1], ItemOutcome::Failed(ItemError::Aborted));
    assert_eq!(state.outcomes[2], ItemOutcome::Pending);
    assert_eq!(state.halt, Some(HaltReason::Aborted));
}

#[tokio::test(start_paused = true)]
async fn second_start_is_rejected_while_running() {
    let harness = Harness::new(MockSurface::new().latency(Duration::from_millis(10)));
    let config = BatchConfig::immediate();

    let (first, second) = tokio::join!(harness.orchestrator.start(chapters(2), &config), async {
        tokio::time::sleep(Duration::from_millis(1)).await;
        harness.orchestrator.start(chapters(5), &config).await
    });

    let state = assert_ok!(first);
    assert_eq!(state.total(), 2);
    assert_eq!(state.summary().succeeded, 2);
    assert_eq!(assert_err!(second), BatchError::AlreadyRunning);

    // 结束后可以再次开始
    let again = assert_ok!(harness.orchestrator.start(chapters(1), &config).await);
    assert_eq!(again.total(), 1);
    assert_settled(&again);
}

#[tokio::test(start_paused = true)]
async fn empty_batch_completes_immediately() {
    let mut harness = Harness::new(MockSurface::new());
    let state = assert_ok!(
        harness
            .orchestrator
            .start(Vec::new(), &BatchConfig::immediate())
            .await
    );

    assert_settled(&state);
    assert_eq!(state.cursor, 0);
    assert!(harness.surface.calls().is_empty());
    assert!(matches!(
        harness.drain().last(),
        Some(ProgressEvent::BatchCompleted { .. })
    ));
}

#[tokio::test]
#[ignore] // 需要已开启远程调试的浏览器：cargo test -- --ignored
async fn test_browser_connection() {
    logger::init();

    let config = Config::from_env().expect("读取配置失败");
    let target = (!config.target_url.is_empty()).then_some(config.target_url.as_str());
    let result = connect_to_browser_and_page(config.browser_debug_port, target, None).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}
