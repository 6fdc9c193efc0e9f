use std::time::Duration;

use crate::cps::{INACTIVITY_LIMIT, SAMPLE_PERIOD};

/// Default base URL of the automation backend.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080/api";
/// Default timeout for a start request.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on the neutralizing request sent by `stop`.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);
/// Default autosave cadence.
pub const DEFAULT_AUTOSAVE_PERIOD: Duration = Duration::from_millis(5_000);

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Base URL of the automation backend.
    pub backend_url: String,
    /// Timeout for a start request.
    pub backend_timeout: Duration,
    /// Upper bound on the neutralizing request; stop never waits longer.
    pub stop_timeout: Duration,
    /// How often the snapshot is persisted while running.
    pub autosave_period: Duration,
    /// Quiet period after which the counter resets.
    pub inactivity_limit: Duration,
    /// Rate sampling cadence.
    pub sample_period: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            autosave_period: DEFAULT_AUTOSAVE_PERIOD,
            inactivity_limit: INACTIVITY_LIMIT,
            sample_period: SAMPLE_PERIOD,
        }
    }
}
