#![warn(missing_docs)]

//! Shared protocol types for autoclick.
//!
//! - [`backend`]: request bodies posted to the automation backend
//! - [`UiEvent`]: messages the engine emits for the presentation layer
//! - [`ipc`]: channel aliases for delivering [`UiEvent`]s

use config::SessionMode;
use serde::{Deserialize, Serialize};

pub mod backend;

pub use backend::{BackendRequest, Endpoint, WireDelayClick};

/// Lifecycle state of a click session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    /// No session; the initial and terminal state.
    #[default]
    Idle,
    /// Waiting for the backend to accept the start request.
    Connecting,
    /// The backend accepted the configuration; clicks may run.
    Active,
    /// The backend rejected the start request or could not be reached.
    Error,
}

impl SessionStatus {
    /// Status line shown for this state; `mode` refines the active text.
    pub fn describe(self, mode: SessionMode) -> &'static str {
        match self {
            Self::Idle => "Disconnected",
            Self::Connecting => "Setting up listeners...",
            Self::Error => "Connection error",
            Self::Active => match mode {
                SessionMode::Key => "Ready (F1: clicks, F3: coords)",
                SessionMode::Mouse => "Ready (Mouse click: execute)",
                SessionMode::Auto => "Running automatic",
                SessionMode::Manual => "Connected",
            },
        }
    }

    /// True for states from which `start` is allowed.
    pub fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Error)
    }

    /// True for states from which `stop` is allowed.
    pub fn can_stop(self) -> bool {
        matches!(self, Self::Active | Self::Error)
    }
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotifyKind {
    /// Informational.
    Info,
    /// Something the user should know about; execution continues.
    Warn,
    /// A failed operation.
    Error,
    /// A completed operation.
    Success,
}

/// Messages sent from the engine to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum UiEvent {
    /// The click counter changed.
    Counter {
        /// Current count.
        count: u64,
    },

    /// A clicks-per-second sample.
    Cps {
        /// Current rate; zero while not tracking.
        cps: f64,
    },

    /// The session changed state.
    Status {
        /// New state.
        status: SessionStatus,
        /// Status line for display.
        text: String,
    },

    /// Notification request for the UI.
    Notify {
        /// Severity.
        kind: NotifyKind,
        /// Message body.
        text: String,
    },

    /// A sequencer run entered a step.
    StepStarted {
        /// Index of the step in the sequence.
        index: usize,
        /// Delay before the step's first click.
        delay_ms: u64,
    },

    /// A cyclic run finished its last step and wrapped to the first.
    CycleCompleted {
        /// Number of completed passes so far.
        cycles: u64,
    },

    /// A one-shot run fired every step.
    RunFinished {
        /// Clicks fired by the run.
        clicks: u64,
    },

    /// The configuration changed while active; the session was stopped.
    RestartRequired,
}

/// Channel helpers for UI events.
pub mod ipc {
    use super::UiEvent;

    /// Tokio unbounded sender for UI events.
    pub type UiTx = tokio::sync::mpsc::UnboundedSender<UiEvent>;
    /// Tokio unbounded receiver for UI events.
    pub type UiRx = tokio::sync::mpsc::UnboundedReceiver<UiEvent>;

    /// Create a standard unbounded UI channel (sender, receiver).
    pub fn ui_channel() -> (UiTx, UiRx) {
        tokio::sync::mpsc::unbounded_channel::<UiEvent>()
    }
}
