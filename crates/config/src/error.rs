//! Error types for configuration loading, editing and persistence.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors produced while editing, loading, or storing a configuration.
pub enum Error {
    #[error("{message}")]
    /// I/O or filesystem read error.
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// I/O or filesystem write error.
    Write {
        /// Optional path associated with the write error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("Stored configuration is corrupt: {0}")]
    /// The stored snapshot could not be decoded at all.
    Corrupt(String),
    #[error("A click sequence needs at least one DelayClick")]
    /// A sequence was built from an empty list of steps.
    EmptySequence,
    #[error("Must keep at least one DelayClick")]
    /// Removing the step would leave the sequence empty.
    LastStep,
    #[error("No DelayClick at index {index} (sequence has {len})")]
    /// A step index was outside the sequence.
    StepIndex {
        /// Requested index.
        index: usize,
        /// Number of steps in the sequence.
        len: usize,
    },
    #[error("Unknown {what}: {value}")]
    /// A mode or speed unit name could not be parsed.
    UnknownName {
        /// Which kind of value was being parsed.
        what: &'static str,
        /// The rejected input.
        value: String,
    },
}

impl Error {
    /// Render a human-friendly message including the path when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {}", p.display(), message),
                None => format!("Read error: {}", message),
            },
            Self::Write { path, message } => match path {
                Some(p) => format!("Write error at {}: {}", p.display(), message),
                None => format!("Write error: {}", message),
            },
            other => other.to_string(),
        }
    }
}
