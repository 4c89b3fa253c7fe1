//! 测试替身
//!
//! 用内存状态模拟章节编辑页：标题框、编辑器、发布 → 确认 → 新建章节。
//! 故障按"第几次处理"（每次 `locate_title_field` 开始一次新的处理，从 0 计）注入。

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::config::ControlLabels;
use crate::error::SurfaceError;
use crate::surface::adapter::{
    ControlQuery, ElementHandle, ElementKind, SurfaceAdapter, SurfaceProbe,
};

/// 模拟的正文写入方式数量（主方式 + 一种备用）
pub const MOCK_BODY_STRATEGIES: usize = 2;

/// "新建章节"环节的故障
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceFault {
    /// 按钮一直不出现
    ControlAbsent,
    /// 按钮可以点击但没有任何效果
    ControlInert,
    /// 点击后新编辑器一直不可用
    EditorStuck,
}

/// 注入的故障，键为处理次序
#[derive(Debug, Clone, Default)]
pub struct MockFaults {
    pub title_missing: HashSet<usize>,
    pub title_rejected: HashSet<usize>,
    pub editor_never_ready: HashSet<usize>,
    /// 主写入方式失败、备用方式成功
    pub body_primary_fails: HashSet<usize>,
    /// 所有写入方式都失败
    pub body_rejected: HashSet<usize>,
    /// 前 N 次查找发布按钮时找不到
    pub publish_missing_lookups: HashMap<usize, usize>,
    /// 发布按钮始终禁用
    pub publish_disabled: HashSet<usize>,
    pub confirm_never: HashSet<usize>,
    pub advance: HashMap<usize, AdvanceFault>,
}

/// 确认发布的章节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedChapter {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct MockState {
    attempt: Option<usize>,
    /// 已经新建过几次章节，句柄按它判断是否失效
    slot: usize,
    title: Option<String>,
    body: Option<String>,
    publish_lookups: usize,
    confirm_visible: bool,
    next_visible: bool,
    editor_stuck: bool,
    confirm_probes_left: usize,
    published: Vec<PublishedChapter>,
    body_strategies_used: Vec<usize>,
    calls: Vec<String>,
}

/// 内存中的页面
pub struct MockSurface {
    labels: ControlLabels,
    faults: MockFaults,
    latency: Duration,
    confirm_after_probes: usize,
    state: Mutex<MockState>,
}

impl Default for MockSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSurface {
    /// 所有操作立即成功
    pub fn new() -> Self {
        Self::with_faults(MockFaults::default())
    }

    pub fn with_faults(faults: MockFaults) -> Self {
        Self {
            labels: ControlLabels::default(),
            faults,
            latency: Duration::ZERO,
            confirm_after_probes: 0,
            state: Mutex::new(MockState::default()),
        }
    }

    /// 每次调用前等待的时间
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 确认按钮在被探测到 N 次之后才出现
    pub fn confirm_after_probes(mut self, probes: usize) -> Self {
        self.confirm_after_probes = probes;
        self
    }

    pub fn labels(mut self, labels: ControlLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn published(&self) -> Vec<PublishedChapter> {
        self.lock().published.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.as_str() == name).count()
    }

    /// 每次正文写入成功时使用的写入方式序号
    pub fn body_strategies_used(&self) -> Vec<usize> {
        self.lock().body_strategies_used.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // 锁中毒时沿用内部数据
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, call: impl Into<String>) -> MutexGuard<'_, MockState> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut state = self.lock();
        state.calls.push(call.into());
        state
    }

    fn has_fault(set: &HashSet<usize>, state: &MockState) -> bool {
        state.attempt.map(|a| set.contains(&a)).unwrap_or(false)
    }

    fn handle(&self, kind: ElementKind, state: &MockState) -> ElementHandle {
        ElementHandle::new(kind, format!("{:?}-{}", kind, state.slot))
    }

    fn control_handle(&self, label: &str, state: &MockState) -> ElementHandle {
        ElementHandle::new(ElementKind::Control, format!("Control:{}-{}", label, state.slot))
    }

    fn is_control(handle: &ElementHandle, label: &str) -> bool {
        handle.locator.starts_with(&format!("Control:{}-", label))
    }

    /// 句柄只在同一个章节槽位内有效
    fn check_fresh(handle: &ElementHandle, state: &MockState) -> Result<(), SurfaceError> {
        if handle.locator.ends_with(&format!("-{}", state.slot)) {
            Ok(())
        } else {
            Err(SurfaceError::Detached(handle.locator.clone()))
        }
    }

    fn editor_is_ready(&self, state: &MockState) -> bool {
        !state.editor_stuck && !Self::has_fault(&self.faults.editor_never_ready, state)
    }

    fn control_for(&self, query: &ControlQuery, state: &mut MockState) -> Option<ElementHandle> {
        if query.matches(&self.labels.publish) {
            let attempt = state.attempt?;
            state.publish_lookups += 1;
            let missing = self
                .faults
                .publish_missing_lookups
                .get(&attempt)
                .copied()
                .unwrap_or(0);
            if state.publish_lookups <= missing {
                return None;
            }
            let handle = self.control_handle(&self.labels.publish, state);
            return Some(if self.faults.publish_disabled.contains(&attempt) {
                handle.disabled()
            } else {
                handle
            });
        }
        if query.matches(&self.labels.confirm) {
            return state
                .confirm_visible
                .then(|| self.control_handle(&self.labels.confirm, state));
        }
        if query.matches(&self.labels.create_next) {
            return state
                .next_visible
                .then(|| self.control_handle(&self.labels.create_next, state));
        }
        None
    }

    fn current_fault(&self, state: &MockState) -> Option<AdvanceFault> {
        state
            .attempt
            .and_then(|a| self.faults.advance.get(&a).copied())
    }
}

#[async_trait]
impl SurfaceAdapter for MockSurface {
    fn name(&self) -> &str {
        "mock"
    }

    async fn locate_title_field(&self) -> Option<ElementHandle> {
        let mut state = self.enter("locate_title_field").await;
        let attempt = state.attempt.map(|a| a + 1).unwrap_or(0);
        state.attempt = Some(attempt);
        state.publish_lookups = 0;
        if self.faults.title_missing.contains(&attempt) {
            return None;
        }
        Some(self.handle(ElementKind::TitleField, &state))
    }

    async fn set_title_value(
        &self,
        handle: &ElementHandle,
        text: &str,
    ) -> Result<(), SurfaceError> {
        let mut state = self.enter("set_title_value").await;
        Self::check_fresh(handle, &state)?;
        if Self::has_fault(&self.faults.title_rejected, &state) {
            return Err(SurfaceError::Rejected("title".to_string()));
        }
        state.title = Some(text.to_string());
        Ok(())
    }

    async fn locate_editor_surface(&self) -> Option<ElementHandle> {
        let state = self.enter("locate_editor_surface").await;
        Some(self.handle(ElementKind::Editor, &state))
    }

    async fn editor_ready(&self, handle: &ElementHandle) -> bool {
        let state = self.enter("editor_ready").await;
        Self::check_fresh(handle, &state).is_ok() && self.editor_is_ready(&state)
    }

    async fn set_body_content(
        &self,
        handle: &ElementHandle,
        text: &str,
    ) -> Result<(), SurfaceError> {
        let mut state = self.enter("set_body_content").await;
        Self::check_fresh(handle, &state)?;
        if Self::has_fault(&self.faults.body_rejected, &state) {
            return Err(SurfaceError::AllStrategiesFailed {
                attempts: MOCK_BODY_STRATEGIES,
            });
        }
        let strategy = if Self::has_fault(&self.faults.body_primary_fails, &state) {
            1
        } else {
            0
        };
        state.body_strategies_used.push(strategy);
        state.body = Some(text.to_string());
        Ok(())
    }

    async fn find_control(&self, query: &ControlQuery) -> Option<ElementHandle> {
        let mut state = self.enter(format!("find_control:{}", query.label)).await;
        self.control_for(query, &mut state)
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), SurfaceError> {
        let mut state = self.enter("click").await;
        Self::check_fresh(handle, &state)?;
        if !handle.enabled {
            return Err(SurfaceError::Rejected("disabled".to_string()));
        }

        if Self::is_control(handle, &self.labels.confirm) {
            if !state.confirm_visible {
                return Err(SurfaceError::Detached(handle.locator.clone()));
            }
            let chapter = PublishedChapter {
                title: state.title.take().unwrap_or_default(),
                body: state.body.take().unwrap_or_default(),
            };
            state.published.push(chapter);
            state.confirm_visible = false;
            state.next_visible = self.current_fault(&state) != Some(AdvanceFault::ControlAbsent);
        } else if Self::is_control(handle, &self.labels.create_next) {
            if !state.next_visible {
                return Err(SurfaceError::Detached(handle.locator.clone()));
            }
            match self.current_fault(&state) {
                Some(AdvanceFault::ControlInert) => {}
                fault => {
                    state.next_visible = false;
                    state.slot += 1;
                    state.editor_stuck = fault == Some(AdvanceFault::EditorStuck);
                }
            }
        } else if Self::is_control(handle, &self.labels.publish)
            && !Self::has_fault(&self.faults.confirm_never, &state)
        {
            state.confirm_visible = true;
            state.confirm_probes_left = self.confirm_after_probes;
        }
        Ok(())
    }

    async fn surface_indicates_state(&self, probe: &SurfaceProbe) -> bool {
        let mut state = self.enter(format!("probe:{:?}", probe)).await;
        match probe {
            SurfaceProbe::TitleFieldPresent => true,
            SurfaceProbe::EditorReady => self.editor_is_ready(&state),
            SurfaceProbe::ControlPresent(query) if query.matches(&self.labels.confirm) => {
                if !state.confirm_visible {
                    return false;
                }
                if state.confirm_probes_left > 0 {
                    state.confirm_probes_left -= 1;
                    return false;
                }
                true
            }
            SurfaceProbe::ControlPresent(query) if query.matches(&self.labels.create_next) => {
                state.next_visible
            }
            SurfaceProbe::ControlPresent(_) => true,
        }
    }
}
