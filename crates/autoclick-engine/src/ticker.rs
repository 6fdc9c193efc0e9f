//! Registry of cancellable background tasks keyed by id.
//!
//! Two shapes of task are supported: periodic callbacks ([`Ticker::start`]) and
//! arbitrary futures that receive their own cancellation token
//! ([`Ticker::spawn`]). Starting a task under an id that is already in use
//! cancels the previous one. Spawned tasks remove their own entry when they
//! finish.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Upper bound on how long [`Ticker::clear_async`] waits for each task.
pub const STOP_WAIT_TIMEOUT_MS: u64 = 50;

struct TaskEntry {
    token: CancellationToken,
    handle: JoinHandle<()>,
    generation: u64,
}

/// Id-keyed set of background tasks with cooperative cancellation.
#[derive(Clone)]
pub struct Ticker {
    entries: Arc<Mutex<HashMap<String, TaskEntry>>>,
    generation: Arc<AtomicU64>,
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

impl Ticker {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Check if a task is registered under `id`.
    pub fn is_active(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when no task is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Start or replace a periodic task for `id`: wait `initial`, then call
    /// `on_tick` on every `interval` until stopped.
    pub fn start<F>(&self, id: String, initial: Duration, interval: Duration, mut on_tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        let id_for_log = id.clone();
        self.spawn(id, None, move |cancel| async move {
            trace!(
                "ticker_start" = %id_for_log,
                init_ms = initial.as_millis(),
                int_ms = interval.as_millis()
            );

            tokio::select! {
                _ = time::sleep(initial) => {}
                _ = cancel.cancelled() => {
                    trace!("ticker_cancelled_initial" = %id_for_log);
                    return;
                }
            }

            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        trace!("ticker_cancelled" = %id_for_log);
                        return;
                    }
                    _ = ticker.tick() => {
                        on_tick();
                    }
                }
            }
        });
    }

    /// Spawn `task` under `id`, replacing any task already registered there.
    ///
    /// The task receives a token that fires on [`stop`](Self::stop),
    /// [`clear_async`](Self::clear_async) or cancellation of `parent`.
    pub fn spawn<F, Fut>(&self, id: String, parent: Option<&CancellationToken>, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop(&id);

        let token = parent.map_or_else(CancellationToken::new, CancellationToken::child_token);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let entries = Arc::clone(&self.entries);
        let key = id.clone();
        let fut = task(token.clone());

        // Hold the lock across spawn so the task cannot deregister before it
        // has been registered.
        let mut map = self.entries.lock();
        let handle = tokio::spawn(async move {
            fut.await;
            let mut map = entries.lock();
            if map.get(&key).is_some_and(|e| e.generation == generation) {
                map.remove(&key);
            }
        });
        map.insert(
            id,
            TaskEntry {
                token,
                handle,
                generation,
            },
        );
    }

    /// Stop a task if present (non-blocking).
    pub fn stop(&self, id: &str) {
        if let Some(entry) = self.entries.lock().remove(id) {
            entry.token.cancel();
            trace!("ticker_stop" = %id);
        }
    }

    /// Stop every task whose id starts with `prefix` (non-blocking).
    pub fn stop_prefix(&self, prefix: &str) {
        let mut map = self.entries.lock();
        map.retain(|id, entry| {
            let keep = !id.starts_with(prefix);
            if !keep {
                entry.token.cancel();
                trace!("ticker_stop" = %id);
            }
            keep
        });
    }

    /// Cancel and wait for all tasks to finish (async).
    pub async fn clear_async(&self) {
        let entries: Vec<TaskEntry> = {
            let mut map = self.entries.lock();
            map.drain().map(|(_, e)| e).collect()
        };

        for e in &entries {
            e.token.cancel();
        }

        for e in entries {
            let _ = time::timeout(Duration::from_millis(STOP_WAIT_TIMEOUT_MS), e.handle).await;
        }
        trace!("ticker_clear_async");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn periodic_task_ticks_until_stopped() {
        let ticker = Ticker::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        ticker.start(
            "autosave".into(),
            Duration::from_millis(100),
            Duration::from_millis(100),
            move || {
                h.fetch_add(1, Ordering::SeqCst);
            },
        );
        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        ticker.stop("autosave");
        assert!(!ticker.is_active("autosave"));
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_task_deregisters_on_completion() {
        let ticker = Ticker::new();
        ticker.spawn("once".into(), None, |_cancel| async {
            time::sleep(Duration::from_millis(10)).await;
        });
        assert!(ticker.is_active("once"));
        time::sleep(Duration::from_millis(20)).await;
        assert!(!ticker.is_active("once"));
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_reaches_children() {
        let ticker = Ticker::new();
        let parent = CancellationToken::new();
        let done = Arc::new(AtomicUsize::new(0));
        for i in 0..3 {
            let d = Arc::clone(&done);
            ticker.spawn(format!("run-{i}"), Some(&parent), move |cancel| async move {
                cancel.cancelled().await;
                d.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(ticker.len(), 3);
        parent.cancel();
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert!(ticker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_an_id_cancels_previous_task() {
        let ticker = Ticker::new();
        let cancelled = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&cancelled);
        ticker.spawn("seq".into(), None, move |cancel| async move {
            cancel.cancelled().await;
            c.fetch_add(1, Ordering::SeqCst);
        });
        ticker.spawn("seq".into(), None, |cancel| async move {
            cancel.cancelled().await;
        });
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
        assert!(ticker.is_active("seq"));
        ticker.clear_async().await;
        assert!(ticker.is_empty());
    }
}
