//! Executes sequencer runs as background tasks.
//!
//! A cyclic run is registered under [`CYCLIC_RUN_ID`]; each one-shot run gets
//! its own id so rapid triggers overlap instead of replacing each other. Every
//! run checks its cancellation token before each step transition and each
//! click, so no click fires after the owning session was cancelled.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use config::DelayClickSequence;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{
    notification::NotificationDispatcher,
    pacing::{Pacer, wait_until},
    sequencer::{Action, RunPolicy, Sequencer},
    ticker::Ticker,
    tracker::ClickTracker,
};

/// Task id of the cyclic run.
pub const CYCLIC_RUN_ID: &str = "sequencer";
/// Task id prefix of one-shot runs.
pub const ONE_SHOT_PREFIX: &str = "oneshot-";

/// Summary of a finished or cancelled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunReport {
    /// Clicks fired.
    pub clicks: u64,
    /// Completed passes (cyclic runs).
    pub cycles: u64,
    /// True when the run was cut short by cancellation.
    pub cancelled: bool,
}

/// Hook for observing run progress, used by tests and diagnostics.
pub trait RunObserver: Send + Sync {
    /// A run entered step `index`, after its delay has elapsed.
    fn on_step_started(&self, _index: usize) {}
    /// A run fired a click for step `index`; `count` is the new counter value.
    fn on_click(&self, _index: usize, _count: u64) {}
    /// A cyclic run wrapped.
    fn on_cycle_completed(&self, _cycles: u64) {}
    /// A run ended.
    fn on_run_finished(&self, _report: &RunReport) {}
}

/// Starts and cancels sequencer runs.
#[derive(Clone)]
pub struct SequenceRunner {
    tracker: ClickTracker,
    notifier: NotificationDispatcher,
    tasks: Ticker,
    next_id: Arc<AtomicU64>,
    observer: Arc<Mutex<Option<Arc<dyn RunObserver>>>>,
}

impl SequenceRunner {
    /// Runner that counts clicks on `tracker`.
    pub fn new(tracker: ClickTracker, notifier: NotificationDispatcher) -> Self {
        Self {
            tracker,
            notifier,
            tasks: Ticker::new(),
            next_id: Arc::new(AtomicU64::new(1)),
            observer: Arc::new(Mutex::new(None)),
        }
    }

    /// Install or clear the run observer.
    pub fn set_observer(&self, observer: Option<Arc<dyn RunObserver>>) {
        *self.observer.lock() = observer;
    }

    /// Start the cyclic run for a session, replacing any previous one.
    pub fn start_cyclic(
        &self,
        sequence: DelayClickSequence,
        interval: Duration,
        session: &CancellationToken,
    ) {
        let seq = Sequencer::new(sequence, interval, RunPolicy::Cyclic);
        self.spawn_run(CYCLIC_RUN_ID.to_string(), seq, session);
    }

    /// Start a one-shot run for a session; returns its task id.
    pub fn run_once(
        &self,
        sequence: DelayClickSequence,
        interval: Duration,
        session: &CancellationToken,
    ) -> String {
        let id = format!(
            "{ONE_SHOT_PREFIX}{}",
            self.next_id.fetch_add(1, Ordering::Relaxed)
        );
        let seq = Sequencer::new(sequence, interval, RunPolicy::OneShot);
        self.spawn_run(id.clone(), seq, session);
        id
    }

    fn spawn_run(&self, id: String, seq: Sequencer, session: &CancellationToken) {
        debug!(
            run = %id,
            interval_us = seq.interval().as_micros() as u64,
            policy = ?seq.policy(),
            "run_start"
        );
        let ctx = RunContext {
            id: id.clone(),
            tracker: self.tracker.clone(),
            notifier: self.notifier.clone(),
            observer: self.observer.lock().clone(),
        };
        self.tasks.spawn(id, Some(session), move |cancel| async move {
            ctx.execute(seq, cancel).await;
        });
    }

    /// True while the cyclic run is registered.
    pub fn is_cycling(&self) -> bool {
        self.tasks.is_active(CYCLIC_RUN_ID)
    }

    /// Number of registered runs.
    pub fn active_runs(&self) -> usize {
        self.tasks.len()
    }

    /// Cancel every run (non-blocking).
    pub fn stop_all(&self) {
        self.tasks.stop(CYCLIC_RUN_ID);
        self.tasks.stop_prefix(ONE_SHOT_PREFIX);
    }

    /// Cancel every run and wait briefly for them to wind down.
    pub async fn clear_async(&self) {
        self.tasks.clear_async().await;
    }
}

/// State moved into a run task.
struct RunContext {
    id: String,
    tracker: ClickTracker,
    notifier: NotificationDispatcher,
    observer: Option<Arc<dyn RunObserver>>,
}

impl RunContext {
    async fn execute(self, mut seq: Sequencer, cancel: CancellationToken) -> RunReport {
        let mut pacer = Pacer::new(seq.interval());
        let mut report = RunReport::default();
        loop {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match seq.next_action() {
                Action::EnterStep { index, delay } => {
                    let delay_ms = delay.as_millis() as u64;
                    trace!(run = %self.id, index, delay_ms, "step_enter");
                    self.notifier.step_started(index, delay_ms);
                    if !delay.is_zero()
                        && !wait_until(Instant::now() + delay, &cancel).await
                    {
                        report.cancelled = true;
                        break;
                    }
                    pacer.resync();
                    if let Some(obs) = &self.observer {
                        obs.on_step_started(index);
                    }
                }
                Action::Click { index } => {
                    let count = self.tracker.increment();
                    report.clicks += 1;
                    if let Some(obs) = &self.observer {
                        obs.on_click(index, count);
                    }
                }
                Action::Pace(interval) => {
                    if !pacer.pace(interval, &cancel).await {
                        report.cancelled = true;
                        break;
                    }
                }
                Action::CycleCompleted { cycles } => {
                    report.cycles = cycles;
                    trace!(run = %self.id, cycles, "cycle_completed");
                    self.notifier.cycle_completed(cycles);
                    if let Some(obs) = &self.observer {
                        obs.on_cycle_completed(cycles);
                    }
                }
                Action::Finished => {
                    self.notifier.run_finished(report.clicks);
                    break;
                }
            }
        }
        debug!(
            run = %self.id,
            clicks = report.clicks,
            cycles = report.cycles,
            cancelled = report.cancelled,
            "run_end"
        );
        if let Some(obs) = &self.observer {
            obs.on_run_finished(&report);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use autoclick_protocol::ipc::ui_channel;
    use config::DelayClickStep;
    use tokio::time;

    use super::*;
    use crate::cps::{INACTIVITY_LIMIT, SAMPLE_PERIOD};

    #[derive(Default)]
    struct Recorder {
        clicks: Mutex<Vec<(usize, Instant)>>,
        finished: Mutex<Vec<RunReport>>,
    }

    impl RunObserver for Recorder {
        fn on_click(&self, index: usize, _count: u64) {
            self.clicks.lock().push((index, Instant::now()));
        }
        fn on_run_finished(&self, report: &RunReport) {
            self.finished.lock().push(*report);
        }
    }

    fn runner() -> (SequenceRunner, ClickTracker, Arc<Recorder>) {
        let (tx, _rx) = ui_channel();
        let notifier = NotificationDispatcher::new(tx);
        let tracker = ClickTracker::new(notifier.clone(), INACTIVITY_LIMIT, SAMPLE_PERIOD);
        let runner = SequenceRunner::new(tracker.clone(), notifier);
        let rec = Arc::new(Recorder::default());
        runner.set_observer(Some(rec.clone()));
        (runner, tracker, rec)
    }

    fn plan(steps: &[(u64, u32)]) -> DelayClickSequence {
        DelayClickSequence::new(
            steps
                .iter()
                .map(|&(d, c)| DelayClickStep::new(d, c))
                .collect(),
        )
        .expect("non-empty")
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_honors_step_delays() {
        let (runner, tracker, rec) = runner();
        let session = CancellationToken::new();
        runner.run_once(plan(&[(0, 3), (10, 2)]), Duration::from_millis(5), &session);
        time::sleep(Duration::from_millis(200)).await;

        let clicks = rec.clicks.lock().clone();
        assert_eq!(clicks.len(), 5);
        assert_eq!(tracker.count(), 5);
        let third = clicks[2];
        let fourth = clicks[3];
        assert_eq!((third.0, fourth.0), (0, 1));
        assert!(fourth.1 - third.1 >= Duration::from_millis(10));
        assert_eq!(
            rec.finished.lock().as_slice(),
            &[RunReport {
                clicks: 5,
                cycles: 0,
                cancelled: false
            }]
        );
        assert_eq!(runner.active_runs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cyclic_run_stops_on_session_cancel() {
        let (runner, tracker, rec) = runner();
        let session = CancellationToken::new();
        runner.start_cyclic(plan(&[(0, 1)]), Duration::from_millis(20), &session);
        time::sleep(Duration::from_millis(110)).await;
        assert!(runner.is_cycling());
        session.cancel();
        time::sleep(Duration::from_millis(1)).await;
        let frozen = tracker.count();
        assert!((5..=7).contains(&frozen), "count {frozen}");
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(tracker.count(), frozen);
        assert!(!runner.is_cycling());
        assert!(rec.finished.lock()[0].cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_one_shots_both_complete() {
        let (runner, tracker, _rec) = runner();
        let session = CancellationToken::new();
        let a = runner.run_once(plan(&[(0, 3)]), Duration::from_millis(5), &session);
        let b = runner.run_once(plan(&[(0, 3)]), Duration::from_millis(5), &session);
        assert_ne!(a, b);
        assert_eq!(runner.active_runs(), 2);
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tracker.count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_step_delay_fires_nothing() {
        let (runner, tracker, _rec) = runner();
        let session = CancellationToken::new();
        runner.run_once(plan(&[(1_000, 5)]), Duration::from_millis(5), &session);
        time::sleep(Duration::from_millis(500)).await;
        runner.stop_all();
        time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(tracker.count(), 0);
    }
}
