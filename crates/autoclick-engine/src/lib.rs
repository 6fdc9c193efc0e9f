//! Autoclick Engine
//!
//! The engine owns everything that happens between "Start" and "Stop":
//! - resolves raw intervals into scheduling periods ([`interval`])
//! - counts clicks, samples clicks-per-second and resets after inactivity
//! - expands a delay/click plan into timed clicks, once or cyclically
//! - drives the session lifecycle against the automation backend
//! - persists the configuration snapshot and emits UI events
//!
//! The public surface is [`Engine`] plus the types needed to drive and observe
//! it. [`Backend`] and [`config::ConfigStore`] are the seams for swapping the
//! transport and the storage.
use std::sync::Arc;

use autoclick_protocol::{BackendRequest, NotifyKind, SessionStatus, ipc::UiTx};
use config::{ConfigStore, Configuration, SessionMode, Snapshot, load_snapshot, save_snapshot};
use parking_lot::Mutex;
use tokio::time;
use tracing::{debug, info, warn};

mod backend;
mod counter;
mod cps;
mod error;
pub mod interval;
mod notification;
mod pacing;
mod runner;
mod sequencer;
mod session;
mod settings;
mod ticker;
mod tracker;

pub mod test_support;

pub use backend::{Backend, HttpBackend};
pub use counter::ClickCounter;
pub use cps::{CpsPhase, CpsPoll, CpsTracker, INACTIVITY_LIMIT, SAMPLE_PERIOD, clicks_per_second};
pub use error::{BackendError, Error, Result, ValidationError};
pub use interval::{TimingAdvisory, effective_duration, resolve};
pub use notification::NotificationDispatcher;
pub use pacing::{PaceStrategy, Pacer};
pub use runner::{RunObserver, RunReport, SequenceRunner};
pub use sequencer::{Action, RunPolicy, Sequencer};
pub use session::Session;
pub use settings::{
    DEFAULT_AUTOSAVE_PERIOD, DEFAULT_BACKEND_TIMEOUT, DEFAULT_BACKEND_URL, DEFAULT_STOP_TIMEOUT,
    EngineConfig,
};
pub use ticker::Ticker;
pub use tracker::{ClickTracker, TrackerSnapshot};

/// Task id of the click tracker driver.
const TRACKER_TASK_ID: &str = "click-tracker";
/// Task id of the periodic snapshot save.
const AUTOSAVE_TASK_ID: &str = "autosave";

/// Result of a manual trigger request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A one-shot run was started.
    Started,
    /// No session is active; nothing happened.
    NotActive,
    /// The session runs automatically; manual triggers are ignored.
    Automatic,
}

/// Keyboard shortcuts the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    /// F1: start when inactive, otherwise trigger a run in KEY mode.
    Execute,
    /// F2: stop an active session.
    Stop,
    /// F3: acknowledge a coordinate capture.
    SaveCoordinates,
}

/// Coordinates configuration, session lifecycle, click runs and persistence.
///
/// Construct via [`Engine::new`] from inside a Tokio runtime; the engine
/// spawns its click tracker driver immediately. Call [`Engine::shutdown`]
/// before dropping the last handle.
#[derive(Clone)]
pub struct Engine {
    /// Session state machine
    session: Arc<Mutex<Session>>,
    /// Editable configuration (the form)
    config: Arc<Mutex<Configuration>>,
    /// Click counter, rate sampling and inactivity reset
    tracker: ClickTracker,
    /// Sequencer runs
    runner: SequenceRunner,
    /// UI events
    notifier: NotificationDispatcher,
    /// Automation backend transport
    backend: Arc<dyn Backend>,
    /// Snapshot storage
    store: Arc<dyn ConfigStore>,
    /// Engine-owned background tasks (tracker driver, autosave)
    tasks: Ticker,
    /// Tunables
    settings: EngineConfig,
}

impl Engine {
    /// Create an engine, restoring the persisted snapshot from `store`.
    ///
    /// - `backend`: transport for start and neutralize requests
    /// - `store`: snapshot storage; unreadable documents fall back to defaults
    /// - `event_tx`: channel for UI events
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<dyn ConfigStore>,
        event_tx: UiTx,
        settings: EngineConfig,
    ) -> Self {
        let notifier = NotificationDispatcher::new(event_tx);
        let tracker = ClickTracker::new(
            notifier.clone(),
            settings.inactivity_limit,
            settings.sample_period,
        );
        let runner = SequenceRunner::new(tracker.clone(), notifier.clone());
        let snapshot = load_snapshot(store.as_ref());
        let mode = snapshot.config.mode;
        debug!(
            title = %snapshot.config.window_title,
            mode = %mode,
            interval = %snapshot.config.interval,
            steps = snapshot.config.sequence.len(),
            counter = snapshot.click_counter,
            "config_loaded"
        );

        let tasks = Ticker::new();
        let driver = tracker.clone();
        tasks.spawn(TRACKER_TASK_ID.to_string(), None, move |cancel| driver.run(cancel));
        tracker.restore(snapshot.click_counter);
        notifier.status(SessionStatus::Idle, mode);

        Self {
            session: Arc::new(Mutex::new(Session::new())),
            config: Arc::new(Mutex::new(snapshot.config)),
            tracker,
            runner,
            notifier,
            backend,
            store,
            tasks,
            settings,
        }
    }

    /// Current editable configuration.
    pub fn configuration(&self) -> Configuration {
        self.config.lock().clone()
    }

    /// Current session state.
    pub fn status(&self) -> SessionStatus {
        self.session.lock().status()
    }

    /// Configuration the current session was started with.
    pub fn session_config(&self) -> Option<Configuration> {
        self.session.lock().snapshot().cloned()
    }

    /// Click counter and rate tracker.
    pub fn tracker(&self) -> &ClickTracker {
        &self.tracker
    }

    /// Current click count.
    pub fn click_count(&self) -> u64 {
        self.tracker.count()
    }

    /// Engine tunables.
    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    /// Install or clear a run observer.
    pub fn set_run_observer(&self, observer: Option<Arc<dyn RunObserver>>) {
        self.runner.set_observer(observer);
    }

    /// Start a session with the current configuration.
    pub async fn start_current(&self) -> Result<()> {
        self.start(self.configuration()).await
    }

    /// Start a session with `config`.
    ///
    /// Valid from Idle or Error. A blank target is rejected before any
    /// backend call. On acceptance the session becomes Active and, in AUTO
    /// mode, the cyclic run begins; on failure the session enters Error.
    pub async fn start(&self, config: Configuration) -> Result<()> {
        if config.window_title.trim().is_empty() {
            let err = ValidationError::BlankTarget;
            self.notifier.notify(NotifyKind::Error, err.to_string());
            return Err(err.into());
        }
        self.session.lock().begin_connect(config.clone())?;
        self.notifier.status(SessionStatus::Connecting, config.mode);
        info!(
            title = %config.window_title.trim(),
            mode = %config.mode,
            interval = %config.interval,
            "session_connecting"
        );

        let request = BackendRequest::start(&config);
        if let Err(e) = self.backend.send(&request).await {
            self.session.lock().fail();
            warn!(error = %e, "session_start_failed");
            self.notifier.status(SessionStatus::Error, config.mode);
            self.notifier.notify(NotifyKind::Error, "Error connecting to API");
            return Err(e.into());
        }

        let token = self.session.lock().activate()?;
        info!(mode = %config.mode, "session_active");
        self.notifier.status(SessionStatus::Active, config.mode);
        self.notifier.notify(NotifyKind::Success, "Listeners activated");

        if let Some(advisory) = TimingAdvisory::check(config.interval) {
            warn!(
                effective_ms = advisory.effective_ms(),
                interval = %config.interval,
                "interval_below_scheduler_floor"
            );
            self.notifier.notify(NotifyKind::Warn, advisory.message());
        }

        if config.mode == SessionMode::Auto {
            self.runner.start_cyclic(
                config.sequence,
                effective_duration(config.interval),
                &token,
            );
        }
        Ok(())
    }

    /// Stop the session. Valid from Active or Error.
    ///
    /// Local execution halts before the backend is told; the neutralizing
    /// request is best-effort and bounded by the stop timeout.
    pub async fn stop(&self) -> Result<()> {
        self.halt().await?;
        self.notifier.notify(NotifyKind::Warn, "AutoClick stopped");
        Ok(())
    }

    async fn halt(&self) -> Result<()> {
        let captured = self.session.lock().deactivate()?;
        self.runner.stop_all();
        self.tracker.end_window();

        let (title, mode) = match captured {
            Some(c) => (c.window_title, c.mode),
            None => {
                let c = self.config.lock();
                (c.window_title.clone(), c.mode)
            }
        };
        info!(mode = %mode, "session_stopped");
        self.notifier.status(SessionStatus::Idle, mode);
        self.neutralize(&title, mode).await;
        Ok(())
    }

    async fn neutralize(&self, title: &str, mode: SessionMode) {
        let request = BackendRequest::neutralize(title, mode);
        match time::timeout(self.settings.stop_timeout, self.backend.send(&request)).await {
            Ok(Ok(())) => debug!(title = %request.title, "backend_neutralized"),
            Ok(Err(e)) => warn!(error = %e, "backend_neutralize_failed"),
            Err(_) => warn!(
                timeout_ms = self.settings.stop_timeout.as_millis() as u64,
                "backend_neutralize_timed_out"
            ),
        }
    }

    /// Replace the configuration and persist it.
    ///
    /// An active session is stopped first; the new settings apply on the
    /// next start.
    pub async fn on_configuration_changed(&self, config: Configuration) -> Result<()> {
        if self.status() == SessionStatus::Active {
            self.halt().await?;
            self.notifier.notify(
                NotifyKind::Warn,
                "Configuration changed - AutoClick stopped. Press Start to apply new settings",
            );
            self.notifier.restart_required();
        }
        *self.config.lock() = config;
        self.save()
    }

    /// Fire one pass of the plan in a triggered mode.
    pub fn trigger(&self) -> TriggerOutcome {
        let (config, token) = {
            let session = self.session.lock();
            match (session.status(), session.snapshot(), session.token()) {
                (SessionStatus::Active, Some(c), Some(t)) => (c.clone(), t.clone()),
                _ => return TriggerOutcome::NotActive,
            }
        };
        if !config.mode.is_triggered() {
            debug!("trigger_ignored_automatic");
            return TriggerOutcome::Automatic;
        }
        let id = self.runner.run_once(
            config.sequence,
            effective_duration(config.interval),
            &token,
        );
        debug!(run = %id, mode = %config.mode, "trigger_started");
        TriggerOutcome::Started
    }

    /// Count one manual click; returns the new total.
    pub fn click(&self) -> u64 {
        let count = self.tracker.increment();
        self.notifier
            .notify(NotifyKind::Success, format!("Click counted! Total: {count}"));
        count
    }

    /// Zero the counter and rate.
    pub fn reset_counter(&self) {
        self.tracker.reset();
        self.notifier.notify(NotifyKind::Info, "Counter reset");
    }

    /// Handle a keyboard shortcut.
    pub async fn handle_shortcut(&self, shortcut: Shortcut) -> Result<()> {
        debug!(?shortcut, "shortcut");
        match shortcut {
            Shortcut::Execute => {
                if self.status() != SessionStatus::Active {
                    return self.start_current().await;
                }
                let key_mode = self
                    .session_config()
                    .is_some_and(|c| c.mode == SessionMode::Key);
                if key_mode {
                    self.trigger();
                }
                Ok(())
            }
            Shortcut::Stop => {
                if self.status() == SessionStatus::Active {
                    self.stop().await?;
                }
                Ok(())
            }
            Shortcut::SaveCoordinates => {
                self.notifier.notify(NotifyKind::Info, "Coordinates saved");
                Ok(())
            }
        }
    }

    /// Persist the current configuration and counter.
    pub fn save(&self) -> Result<()> {
        let snapshot = Snapshot::new(self.configuration(), self.tracker.count());
        save_snapshot(self.store.as_ref(), &snapshot)?;
        Ok(())
    }

    /// Start persisting the snapshot every autosave period.
    pub fn start_autosave(&self) {
        let period = self.settings.autosave_period;
        let store = Arc::clone(&self.store);
        let config = Arc::clone(&self.config);
        let tracker = self.tracker.clone();
        self.tasks.start(AUTOSAVE_TASK_ID.to_string(), period, period, move || {
            let snapshot = Snapshot::new(config.lock().clone(), tracker.count());
            if let Err(e) = save_snapshot(store.as_ref(), &snapshot) {
                warn!(error = %e, "autosave_failed");
            }
        });
    }

    /// Stop all runs and background tasks and write a final snapshot.
    ///
    /// An active session is not stopped; the backend keeps its configuration.
    pub async fn shutdown(&self) {
        self.runner.clear_async().await;
        self.tasks.clear_async().await;
        self.tracker.end_window();
        if let Err(e) = self.save() {
            warn!(error = %e, "final_save_failed");
        }
        debug!("engine_shutdown");
    }
}
