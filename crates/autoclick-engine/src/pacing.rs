//! Waiting between clicks.
//!
//! Periods at or above [`MIN_RELIABLE_INTERVAL_MS`] use the timer directly.
//! Shorter periods poll the clock between cooperative yields for a bounded
//! number of iterations, then fall back to the timer, so a sub-millisecond
//! interval runs as fast as the scheduler allows without starving other tasks.
//! Deadlines are absolute: each pace targets the previous deadline plus the
//! interval, which keeps long runs from accumulating drift.

use std::time::Duration;

use tokio::{
    task,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::interval::MIN_RELIABLE_INTERVAL_MS;

/// Yields spent polling the clock before a polling pace falls back to the timer.
pub const POLL_SPIN_LIMIT: u32 = 64;

/// How a pacer waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceStrategy {
    /// Sleep on the runtime timer.
    Timer,
    /// Poll the clock between yields.
    Polling,
}

impl PaceStrategy {
    /// Strategy for a given interval.
    pub fn for_interval(interval: Duration) -> Self {
        if interval.as_secs_f64() * 1_000.0 < MIN_RELIABLE_INTERVAL_MS {
            Self::Polling
        } else {
            Self::Timer
        }
    }
}

/// Absolute-deadline pacer for one run.
#[derive(Debug)]
pub struct Pacer {
    strategy: PaceStrategy,
    deadline: Option<Instant>,
}

impl Pacer {
    /// Pacer for `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            strategy: PaceStrategy::for_interval(interval),
            deadline: None,
        }
    }

    /// Strategy in use.
    pub fn strategy(&self) -> PaceStrategy {
        self.strategy
    }

    /// Forget the schedule; the next pace is measured from now.
    pub fn resync(&mut self) {
        self.deadline = None;
    }

    /// Wait one `interval` past the previous deadline. Returns false if
    /// `cancel` fired first.
    pub async fn pace(&mut self, interval: Duration, cancel: &CancellationToken) -> bool {
        let now = Instant::now();
        let target = self.deadline.map_or(now + interval, |prev| (prev + interval).max(now));
        self.deadline = Some(target);
        match self.strategy {
            PaceStrategy::Timer => wait_until(target, cancel).await,
            PaceStrategy::Polling => poll_until(target, cancel).await,
        }
    }
}

/// Sleep until `deadline` unless cancelled. Returns false on cancellation.
pub async fn wait_until(deadline: Instant, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = time::sleep_until(deadline) => !cancel.is_cancelled(),
    }
}

async fn poll_until(deadline: Instant, cancel: &CancellationToken) -> bool {
    // At least one yield per pace, even for a zero interval.
    task::yield_now().await;
    let mut spins = 0;
    while Instant::now() < deadline {
        if cancel.is_cancelled() {
            return false;
        }
        if spins >= POLL_SPIN_LIMIT {
            return wait_until(deadline, cancel).await;
        }
        spins += 1;
        task::yield_now().await;
    }
    !cancel.is_cancelled()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_switches_at_floor() {
        assert_eq!(
            PaceStrategy::for_interval(Duration::from_millis(4)),
            PaceStrategy::Timer
        );
        assert_eq!(
            PaceStrategy::for_interval(Duration::from_micros(3_999)),
            PaceStrategy::Polling
        );
        assert_eq!(
            PaceStrategy::for_interval(Duration::ZERO),
            PaceStrategy::Polling
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadlines_do_not_drift() {
        let cancel = CancellationToken::new();
        let interval = Duration::from_millis(10);
        let mut pacer = Pacer::new(interval);
        let start = Instant::now();
        for _ in 0..50 {
            assert!(pacer.pace(interval, &cancel).await);
        }
        let elapsed = Instant::now() - start;
        assert!(elapsed >= Duration::from_millis(500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(510), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn polling_pace_reaches_deadline() {
        let cancel = CancellationToken::new();
        let interval = Duration::from_micros(500);
        let mut pacer = Pacer::new(interval);
        assert_eq!(pacer.strategy(), PaceStrategy::Polling);
        let start = Instant::now();
        assert!(pacer.pace(interval, &cancel).await);
        assert!(Instant::now() - start >= interval);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_wait() {
        let cancel = CancellationToken::new();
        let interval = Duration::from_secs(60);
        let mut pacer = Pacer::new(interval);
        let c = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(5)).await;
            c.cancel();
        });
        let start = Instant::now();
        assert!(!pacer.pace(interval, &cancel).await);
        assert!(Instant::now() - start < Duration::from_secs(1));
    }
}
