//! Shared click counter with rate sampling and inactivity reset.
//!
//! [`ClickTracker`] combines a [`ClickCounter`] and a [`CpsTracker`] behind one
//! lock, so an increment and the re-arming of the inactivity deadline happen
//! together. A single driver task ([`ClickTracker::run`]) sleeps until the
//! earliest pending deadline and is woken whenever a click moves it.

use std::{future, sync::Arc, time::Duration};

use autoclick_protocol::NotifyKind;
use parking_lot::Mutex;
use tokio::{
    sync::Notify,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::{
    counter::ClickCounter,
    cps::{CpsPhase, CpsPoll, CpsTracker},
    notification::NotificationDispatcher,
};

struct TrackerState {
    counter: ClickCounter,
    cps: CpsTracker,
}

/// Point-in-time view of the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSnapshot {
    /// Current count.
    pub count: u64,
    /// Last rate sample.
    pub cps: f64,
    /// Whether a measurement window is open.
    pub phase: CpsPhase,
}

/// Cloneable handle to the click counter and its rate tracker.
#[derive(Clone)]
pub struct ClickTracker {
    state: Arc<Mutex<TrackerState>>,
    wake: Arc<Notify>,
    notifier: NotificationDispatcher,
    limit: Duration,
}

impl ClickTracker {
    /// Tracker that resets after `limit` without clicks and samples the rate
    /// every `period`.
    pub fn new(notifier: NotificationDispatcher, limit: Duration, period: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(TrackerState {
                counter: ClickCounter::new(),
                cps: CpsTracker::new(limit, period),
            })),
            wake: Arc::new(Notify::new()),
            notifier,
            limit,
        }
    }

    /// Count one click and return the new total.
    pub fn increment(&self) -> u64 {
        let count = {
            let mut st = self.state.lock();
            let now = Instant::now();
            let count = st.counter.increment(now);
            if st.cps.on_click(count.saturating_sub(1), now) {
                trace!(count, "cps_window_opened");
            }
            count
        };
        self.wake.notify_one();
        self.notifier.counter(count);
        count
    }

    /// Zero the counter and close the rate window.
    pub fn reset(&self) {
        {
            let mut st = self.state.lock();
            st.counter.reset();
            st.cps.reset();
        }
        self.wake.notify_one();
        self.notifier.counter(0);
        self.notifier.cps(0.0);
    }

    /// Restore a persisted count. A non-zero count opens a window and arms
    /// the inactivity deadline from now.
    pub fn restore(&self, count: u64) {
        {
            let mut st = self.state.lock();
            let now = Instant::now();
            st.counter.restore(count, now);
            if count > 0 {
                st.cps.resume(now);
            } else {
                st.cps.reset();
            }
        }
        debug!(count, "click_counter_restored");
        self.wake.notify_one();
        self.notifier.counter(count);
    }

    /// Close the rate window; the count and the inactivity deadline remain.
    pub fn end_window(&self) {
        self.state.lock().cps.end_window();
        self.wake.notify_one();
        self.notifier.cps(0.0);
    }

    /// Current count.
    pub fn count(&self) -> u64 {
        self.state.lock().counter.count()
    }

    /// Last rate sample.
    pub fn cps(&self) -> f64 {
        self.state.lock().cps.current()
    }

    /// Time of the most recent click.
    pub fn last_click_at(&self) -> Option<Instant> {
        self.state.lock().counter.last_click_at()
    }

    /// Inactivity limit in effect.
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Consistent view of count, rate and phase.
    pub fn snapshot(&self) -> TrackerSnapshot {
        let st = self.state.lock();
        TrackerSnapshot {
            count: st.counter.count(),
            cps: st.cps.current(),
            phase: st.cps.phase(),
        }
    }

    /// Drive sampling and the inactivity deadline until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        trace!("click_tracker_started");
        loop {
            let due = self.state.lock().cps.due_at();
            let sleep = async {
                match due {
                    Some(at) => time::sleep_until(at).await,
                    None => future::pending::<()>().await,
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.wake.notified() => {}
                _ = sleep => self.poll_due(),
            }
        }
        trace!("click_tracker_stopped");
    }

    fn poll_due(&self) {
        let outcome = {
            let mut st = self.state.lock();
            let count = st.counter.count();
            let outcome = st.cps.poll(count, Instant::now());
            if outcome == CpsPoll::Inactive {
                st.counter.reset();
            }
            outcome
        };
        match outcome {
            CpsPoll::Idle => {}
            CpsPoll::Sample(cps) => {
                trace!(cps, "cps_sample");
                self.notifier.cps(cps);
            }
            CpsPoll::Inactive => {
                info!(limit_ms = self.limit.as_millis() as u64, "inactivity_reset");
                self.notifier.counter(0);
                self.notifier.cps(0.0);
                self.notifier.notify(
                    NotifyKind::Info,
                    format!(
                        "Counter and CPS reset due to inactivity ({}s)",
                        self.limit.as_secs()
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use autoclick_protocol::{UiEvent, ipc::ui_channel};

    use super::*;
    use crate::cps::{INACTIVITY_LIMIT, SAMPLE_PERIOD};

    fn tracker() -> (ClickTracker, CancellationToken) {
        let (tx, _rx) = ui_channel();
        let t = ClickTracker::new(
            NotificationDispatcher::new(tx),
            INACTIVITY_LIMIT,
            SAMPLE_PERIOD,
        );
        let cancel = CancellationToken::new();
        tokio::spawn(t.clone().run(cancel.clone()));
        (t, cancel)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn resets_exactly_after_quiet_period() {
        let (t, cancel) = tracker();
        for _ in 0..3 {
            t.increment();
        }
        time::sleep(ms(4_999)).await;
        assert_eq!(t.count(), 3);
        time::sleep(ms(2)).await;
        assert_eq!(t.count(), 0);
        assert_eq!(t.cps(), 0.0);
        assert_eq!(t.snapshot().phase, CpsPhase::Stopped);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn each_click_rearms_the_deadline() {
        let (t, cancel) = tracker();
        t.increment();
        time::sleep(ms(3_000)).await;
        t.increment();
        time::sleep(ms(3_000)).await;
        t.increment();
        time::sleep(ms(4_900)).await;
        assert_eq!(t.count(), 3);
        time::sleep(ms(200)).await;
        assert_eq!(t.count(), 0);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn samples_rate_every_second() {
        let (t, cancel) = tracker();
        for _ in 0..10 {
            t.increment();
        }
        time::sleep(ms(1_001)).await;
        assert!((t.cps() - 10.0).abs() < 0.05, "cps {}", t.cps());
        time::sleep(ms(1_000)).await;
        assert!((t.cps() - 5.0).abs() < 0.05, "cps {}", t.cps());
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn restored_count_is_subject_to_inactivity() {
        let (t, cancel) = tracker();
        t.restore(42);
        assert_eq!(t.count(), 42);
        assert_eq!(t.snapshot().phase, CpsPhase::Tracking);
        time::sleep(ms(5_001)).await;
        assert_eq!(t.count(), 0);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn ended_window_still_resets_on_inactivity() {
        let (t, cancel) = tracker();
        t.increment();
        t.end_window();
        assert_eq!(t.count(), 1);
        assert_eq!(t.cps(), 0.0);
        time::sleep(ms(5_001)).await;
        assert_eq!(t.count(), 0);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn clicks_after_ended_window_do_not_inflate_rate() {
        let (t, cancel) = tracker();
        for _ in 0..50 {
            t.increment();
        }
        time::sleep(ms(1_001)).await;
        assert!(t.cps() > 0.0);
        t.end_window();
        time::sleep(ms(100)).await;
        t.increment();
        time::sleep(ms(1_001)).await;
        assert_eq!(t.count(), 51);
        assert_eq!(t.cps(), 0.0);
        assert_eq!(t.snapshot().phase, CpsPhase::Stopped);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn inactivity_is_announced() {
        let (tx, mut rx) = ui_channel();
        let t = ClickTracker::new(
            NotificationDispatcher::new(tx),
            INACTIVITY_LIMIT,
            SAMPLE_PERIOD,
        );
        let cancel = CancellationToken::new();
        tokio::spawn(t.clone().run(cancel.clone()));
        t.increment();
        time::sleep(ms(5_001)).await;
        let mut saw_notice = false;
        while let Ok(ev) = rx.try_recv() {
            if let UiEvent::Notify { text, .. } = ev {
                assert_eq!(text, "Counter and CPS reset due to inactivity (5s)");
                saw_notice = true;
            }
        }
        assert!(saw_notice);
        cancel.cancel();
    }
}
