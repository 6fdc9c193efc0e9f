// Defaults and constants for the click configuration form

/// Raw interval used when the stored or typed value is missing or unusable.
pub const DEFAULT_INTERVAL: u64 = 100;

/// Delay of the step seeded into an empty sequence.
pub const DEFAULT_STEP_DELAY_MS: u64 = 0;
/// Click count of the step seeded into an empty sequence.
pub const DEFAULT_STEP_COUNT: u32 = 10;

/// Count used for a step whose count is missing, zero or negative.
pub(crate) const FALLBACK_STEP_COUNT: u32 = 1;

/// Directory (under `$HOME`) holding the persisted configuration.
pub(crate) const CONFIG_DIR: &str = ".autoclick";
/// File name of the persisted configuration snapshot.
pub(crate) const CONFIG_FILE: &str = "config.json";
