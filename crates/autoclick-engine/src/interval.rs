//! Conversion of a raw interval and speed unit into an effective scheduling period.
//!
//! [`resolve`] is pure and total. Whether the result is actually achievable is a
//! separate question answered by [`TimingAdvisory::check`]: a cooperative
//! single-threaded scheduler cannot reliably observe periods under
//! [`MIN_RELIABLE_INTERVAL_MS`], so such intervals run best-effort and the
//! limitation is reported rather than hidden.

use std::time::Duration;

use config::{IntervalSpec, SpeedUnit};

/// Smallest period (ms) the scheduler can reliably observe.
pub const MIN_RELIABLE_INTERVAL_MS: f64 = 4.0;

/// Lower clamp (ms) for microsecond intervals.
const MIN_MICROS_MS: f64 = 0.001;
/// Lower clamp (ms) for nanosecond intervals.
const MIN_NANOS_MS: f64 = 0.000_001;

/// Resolve `raw` in `unit` to an effective period in milliseconds.
pub fn resolve(raw: u64, unit: SpeedUnit) -> f64 {
    let raw = raw as f64;
    match unit {
        SpeedUnit::Milliseconds => raw,
        SpeedUnit::Microseconds => (raw / 1_000.0).max(MIN_MICROS_MS),
        SpeedUnit::Nanoseconds => (raw / 1_000_000.0).max(MIN_NANOS_MS),
    }
}

/// Resolve form text; absent or non-numeric text resolves as the default interval.
pub fn resolve_text(text: Option<&str>, unit: SpeedUnit) -> f64 {
    resolve(IntervalSpec::parse_raw(text), unit)
}

/// Effective period of `spec` in milliseconds.
pub fn effective_ms(spec: IntervalSpec) -> f64 {
    resolve(spec.raw, spec.unit)
}

/// Effective period of `spec` as a [`Duration`].
pub fn effective_duration(spec: IntervalSpec) -> Duration {
    Duration::from_secs_f64(effective_ms(spec) / 1_000.0)
}

/// Warning that a requested interval is finer than the scheduler can honor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimingAdvisory {
    /// Nanosecond intervals cannot be reproduced at all.
    Nanoseconds {
        /// Resolved period in milliseconds.
        effective_ms: f64,
    },
    /// Microsecond intervals are limited to roughly millisecond precision.
    Microseconds {
        /// Resolved period in milliseconds.
        effective_ms: f64,
    },
    /// Millisecond intervals under the scheduler floor.
    BelowFloor {
        /// Resolved period in milliseconds.
        effective_ms: f64,
    },
}

impl TimingAdvisory {
    /// Return an advisory when `spec` resolves below the reliable floor.
    pub fn check(spec: IntervalSpec) -> Option<Self> {
        let effective_ms = effective_ms(spec);
        if effective_ms >= MIN_RELIABLE_INTERVAL_MS {
            return None;
        }
        Some(match spec.unit {
            SpeedUnit::Nanoseconds => Self::Nanoseconds { effective_ms },
            SpeedUnit::Microseconds => Self::Microseconds { effective_ms },
            SpeedUnit::Milliseconds => Self::BelowFloor { effective_ms },
        })
    }

    /// Resolved period that triggered the advisory.
    pub fn effective_ms(&self) -> f64 {
        match *self {
            Self::Nanoseconds { effective_ms }
            | Self::Microseconds { effective_ms }
            | Self::BelowFloor { effective_ms } => effective_ms,
        }
    }

    /// User-facing warning text.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Nanoseconds { .. } => {
                "Scheduler cannot reproduce nanosecond precision. Click pacing is approximate"
            }
            Self::Microseconds { .. } => {
                "Scheduler timing is limited to ~1ms precision. Click pacing is approximate"
            }
            Self::BelowFloor { .. } => {
                "Scheduler minimum timing is ~4ms. Very fast intervals are approximate"
            }
        }
    }
}
