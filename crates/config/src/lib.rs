#![warn(missing_docs)]

//! Configuration for autoclick: the click plan, trigger mode, interval and the
//! persisted snapshot that carries them between runs.

use std::{
    env,
    path::{Path, PathBuf},
};

mod defaults;
mod error;
mod snapshot;
mod store;
mod types;

pub use defaults::{DEFAULT_INTERVAL, DEFAULT_STEP_COUNT, DEFAULT_STEP_DELAY_MS};
pub use error::Error;
pub use snapshot::Snapshot;
pub use store::{ConfigStore, FileStore, MemoryStore, load_snapshot, save_snapshot};
pub use types::{
    Configuration, DelayClickSequence, DelayClickStep, IntervalSpec, SessionMode, SpeedUnit,
};

/// Determine the preferred config path (`~/.autoclick/config.json`).
pub fn default_config_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(defaults::CONFIG_DIR);
    p.push(defaults::CONFIG_FILE);
    p
}

/// Resolve the effective config path: `explicit` when provided, else the default.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(default_config_path, Path::to_path_buf)
}
