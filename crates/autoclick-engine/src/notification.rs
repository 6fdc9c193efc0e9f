use autoclick_protocol::{NotifyKind, SessionStatus, UiEvent, ipc::UiTx};
use config::SessionMode;
use tracing::{info, trace};

use crate::{Error, Result};

/// Sends counter updates, status changes and notifications to the UI layer.
///
/// Telemetry helpers never fail: a closed channel only means nobody is
/// watching. Use [`send`](Self::send) when the caller needs to know.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: UiTx,
}

impl NotificationDispatcher {
    /// Create a new dispatcher from a UI event channel.
    pub fn new(tx: UiTx) -> Self {
        Self { tx }
    }

    /// Send an event, reporting a closed channel.
    pub fn send(&self, event: UiEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| Error::ChannelClosed)
    }

    fn emit(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            trace!("ui_channel_closed");
        }
    }

    /// Show a notification.
    pub fn notify(&self, kind: NotifyKind, text: impl Into<String>) {
        let text = text.into();
        info!(kind = ?kind, text = %text, "notification_display");
        self.emit(UiEvent::Notify { kind, text });
    }

    /// Publish a session state change.
    pub fn status(&self, status: SessionStatus, mode: SessionMode) {
        self.emit(UiEvent::Status {
            status,
            text: status.describe(mode).to_string(),
        });
    }

    /// Publish the counter value.
    pub fn counter(&self, count: u64) {
        self.emit(UiEvent::Counter { count });
    }

    /// Publish a rate sample.
    pub fn cps(&self, cps: f64) {
        self.emit(UiEvent::Cps { cps });
    }

    /// A run entered step `index`.
    pub fn step_started(&self, index: usize, delay_ms: u64) {
        self.emit(UiEvent::StepStarted { index, delay_ms });
    }

    /// A cyclic run wrapped.
    pub fn cycle_completed(&self, cycles: u64) {
        self.emit(UiEvent::CycleCompleted { cycles });
    }

    /// A one-shot run finished.
    pub fn run_finished(&self, clicks: u64) {
        self.emit(UiEvent::RunFinished { clicks });
    }

    /// The configuration changed under an active session.
    pub fn restart_required(&self) {
        self.emit(UiEvent::RestartRequired);
    }
}

#[cfg(test)]
mod tests {
    use autoclick_protocol::ipc::ui_channel;

    use super::*;

    #[test]
    fn status_carries_mode_text() {
        let (tx, mut rx) = ui_channel();
        let n = NotificationDispatcher::new(tx);
        n.status(SessionStatus::Active, SessionMode::Mouse);
        assert_eq!(
            rx.try_recv().ok(),
            Some(UiEvent::Status {
                status: SessionStatus::Active,
                text: "Ready (Mouse click: execute)".into(),
            })
        );
    }

    #[test]
    fn closed_channel_is_reported_only_by_send() {
        let (tx, rx) = ui_channel();
        drop(rx);
        let n = NotificationDispatcher::new(tx);
        n.notify(NotifyKind::Info, "nobody listening");
        assert!(matches!(
            n.send(UiEvent::RestartRequired),
            Err(Error::ChannelClosed)
        ));
    }
}
