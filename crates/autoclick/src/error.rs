//! Error handling for the autoclick binary.

use std::{io, result};

use thiserror::Error;

/// Convenient result type for autoclick operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while running autoclick.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Errors surfaced by the engine.
    #[error("{0}")]
    Engine(#[from] autoclick_engine::Error),
    /// Failed to construct the backend client.
    #[error("Backend error: {0}")]
    Backend(#[from] autoclick_engine::BackendError),
    /// Configuration loading, editing or saving errors.
    #[error("Configuration error: {}", .0.pretty())]
    Config(#[from] config::Error),
}
