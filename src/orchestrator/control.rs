//! 批次控制句柄
//!
//! 操作员（控制台、信号处理、界面）通过它暂停 / 继续 / 停止 / 中止批次并读取进度。
//! 状态保存在 `watch` 通道里，编排器是唯一的写入方，其余只是设置标记。

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::models::BatchState;

struct Shared {
    state: watch::Sender<BatchState>,
    /// 当前批次的取消令牌，每个批次换一个新的
    cancel: Mutex<CancellationToken>,
}

/// 可克隆的控制句柄
#[derive(Clone)]
pub struct BatchControl {
    shared: Arc<Shared>,
}

impl Default for BatchControl {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchControl {
    pub fn new() -> Self {
        let (state, _) = watch::channel(BatchState::default());
        Self {
            shared: Arc::new(Shared {
                state,
                cancel: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    /// 请求在下一个安全检查点停止，不打断正在进行的等待
    ///
    /// 返回是否有正在运行的批次接受了请求。
    pub fn request_stop(&self) -> bool {
        self.shared.state.send_if_modified(|state| {
            if state.running && !state.stop_requested {
                state.stop_requested = true;
                true
            } else {
                false
            }
        })
    }

    /// 在下一个章节开始前暂停
    pub fn pause(&self) -> bool {
        self.shared.state.send_if_modified(|state| {
            if state.running && !state.paused {
                state.paused = true;
                true
            } else {
                false
            }
        })
    }

    pub fn resume(&self) -> bool {
        self.shared.state.send_if_modified(|state| {
            if state.paused {
                state.paused = false;
                true
            } else {
                false
            }
        })
    }

    /// 停止并立即取消正在进行的等待，当前章节记为 `Aborted`
    pub fn abort(&self) -> bool {
        let accepted = self.request_stop() || self.is_running();
        if accepted {
            self.current_token().cancel();
        }
        accepted
    }

    /// 当前状态快照
    pub fn current_progress(&self) -> BatchState {
        self.shared.state.borrow().clone()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<BatchState> {
        self.shared.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.borrow().running
    }

    pub fn stop_requested(&self) -> bool {
        self.shared.state.borrow().stop_requested
    }

    pub(crate) fn current_token(&self) -> CancellationToken {
        self.shared
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 接受新批次：没有批次在运行时替换整个状态并换新的取消令牌
    ///
    /// 令牌在 `running` 对外可见之前换好，之后的 `abort` 一定取消的是这个批次。
    pub(crate) fn try_begin(&self, next: BatchState) -> Option<CancellationToken> {
        let token = CancellationToken::new();
        let accepted = self.shared.state.send_if_modified(|state| {
            if state.running {
                return false;
            }
            *self
                .shared
                .cancel
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = token.clone();
            *state = next;
            state.running = true;
            true
        });
        accepted.then_some(token)
    }

    pub(crate) fn update(&self, modify: impl FnOnce(&mut BatchState)) {
        self.shared.state.send_modify(modify);
    }
}
