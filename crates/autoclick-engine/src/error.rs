use std::{result::Result as StdResult, time::Duration};

use autoclick_protocol::SessionStatus;
use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the autoclick engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any backend call.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The automation backend refused the request or could not be reached.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The requested operation is not valid in the current session state.
    #[error("Cannot {op} while session is {from:?}")]
    InvalidTransition {
        /// Operation that was attempted.
        op: &'static str,
        /// State the session was in.
        from: SessionStatus,
    },

    /// Reading or writing the persisted configuration failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] config::Error),

    /// The UI event channel has been closed by the receiver.
    #[error("UI channel closed")]
    ChannelClosed,
}

/// Reasons a start request is rejected locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The target window title is empty or whitespace.
    #[error("Please enter the window title")]
    BlankTarget,
}

/// Failures talking to the automation backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend answered with a non-2xx status.
    #[error("HTTP Error: {0}")]
    Status(u16),

    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend did not answer in time.
    #[error("no response within {0:?}")]
    Timeout(Duration),
}
