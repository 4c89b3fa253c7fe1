//! 条件轮询器 - 基础设施层
//!
//! 整个引擎唯一的同步原语：页面没有可靠的完成事件，所有"等待页面变化"
//! 都表达为"在限定时间内反复检查某个条件"。
//!
//! 轮询定时器（`tokio::time::Interval`）在 `wait_until` 内部创建，函数以任何
//! 方式返回（满足 / 超时 / 取消）时随之释放，返回后不会再调用探测函数。

use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 轮询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// 条件已满足
    Satisfied { elapsed: Duration },
    /// 超时
    TimedOut,
    /// 调用方取消
    Cancelled,
}

impl WaitOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied { .. })
    }
}

/// 等待 `probe` 返回 true
///
/// # 参数
/// - `probe`: 无副作用（或幂等）的探测函数，每个周期调用一次，首次调用立即发生
/// - `timeout`: 超时时间
/// - `interval`: 轮询周期（为 0 时按 1ms 处理）
/// - `cancel`: 外部取消令牌
///
/// # 返回
/// 最迟在 `timeout + interval`（加上最后一次探测本身的耗时）内返回 `TimedOut`
pub async fn wait_until<F, Fut>(
    mut probe: F,
    timeout: Duration,
    interval: Duration,
    cancel: &CancellationToken,
) -> WaitOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();
    let deadline = started + timeout;

    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempts: u32 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return WaitOutcome::Cancelled,
            _ = ticker.tick() => {}
        }

        attempts += 1;
        let satisfied = tokio::select! {
            biased;
            _ = cancel.cancelled() => return WaitOutcome::Cancelled,
            ok = probe() => ok,
        };

        if satisfied {
            let elapsed = started.elapsed();
            debug!("条件满足: 第 {} 次检查, 耗时 {:?}", attempts, elapsed);
            return WaitOutcome::Satisfied { elapsed };
        }

        if Instant::now() >= deadline {
            debug!("等待超时: 共检查 {} 次, 超时 {:?}", attempts, timeout);
            return WaitOutcome::TimedOut;
        }
    }
}

/// 可取消的固定等待，被取消时返回 false
pub async fn sleep_cancellable(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
