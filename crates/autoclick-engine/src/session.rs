//! Session lifecycle bookkeeping.
//!
//! ```text
//! Idle ──start──▶ Connecting ──accepted──▶ Active ──stop──▶ Idle
//!                     │                                 ▲
//!                     └──rejected──▶ Error ──stop───────┘
//!                                      └────start──▶ Connecting
//! ```
//!
//! [`Session`] only tracks state. The engine performs the side effects
//! (backend calls, runs, notifications) around each transition.

use autoclick_protocol::SessionStatus;
use config::Configuration;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Current session state plus the configuration it was started with.
#[derive(Debug, Default)]
pub struct Session {
    status: SessionStatus,
    snapshot: Option<Configuration>,
    token: Option<CancellationToken>,
}

impl Session {
    /// Idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Configuration captured at start; present while Connecting, Active or Error.
    pub fn snapshot(&self) -> Option<&Configuration> {
        self.snapshot.as_ref()
    }

    /// Cancellation token of the active session.
    pub fn token(&self) -> Option<&CancellationToken> {
        self.token.as_ref()
    }

    /// Idle/Error → Connecting, capturing `config`.
    pub fn begin_connect(&mut self, config: Configuration) -> Result<()> {
        if !self.status.can_start() {
            return Err(Error::InvalidTransition {
                op: "start",
                from: self.status,
            });
        }
        self.status = SessionStatus::Connecting;
        self.snapshot = Some(config);
        self.token = None;
        Ok(())
    }

    /// Connecting → Active. Returns the token that scopes the session's runs.
    pub fn activate(&mut self) -> Result<CancellationToken> {
        if self.status != SessionStatus::Connecting {
            return Err(Error::InvalidTransition {
                op: "activate",
                from: self.status,
            });
        }
        let token = CancellationToken::new();
        self.status = SessionStatus::Active;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Connecting → Error.
    pub fn fail(&mut self) {
        self.status = SessionStatus::Error;
        self.token = None;
    }

    /// Active/Error → Idle. Cancels the session token and returns the
    /// captured configuration.
    pub fn deactivate(&mut self) -> Result<Option<Configuration>> {
        if !self.status.can_stop() {
            return Err(Error::InvalidTransition {
                op: "stop",
                from: self.status,
            });
        }
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.status = SessionStatus::Idle;
        Ok(self.snapshot.take())
    }
}
