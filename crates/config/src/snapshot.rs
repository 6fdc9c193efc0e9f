//! Persisted configuration snapshot: tolerant decoding and encoding.
//!
//! The stored document mirrors the form fields plus the click counter:
//!
//! ```json
//! { "windowTitle": "Game", "mode": "KEY", "interval": 100, "speedMode": "MS",
//!   "delayClicks": [{ "delay": 0, "count": 10 }], "clickCounter": 0 }
//! ```
//!
//! Decoding never fails on individual fields. Each missing or malformed field
//! falls back to its default; only a document that is not a JSON object at all
//! is reported as [`Error::Corrupt`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
    Configuration, DelayClickSequence, DelayClickStep, Error, IntervalSpec, SessionMode,
    SpeedUnit, defaults::DEFAULT_INTERVAL, types::parse_leading_int,
};

/// Configuration form plus the click counter at the time of saving.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Form values.
    pub config: Configuration,
    /// Click counter value.
    pub click_counter: u64,
}

/// On-disk shape, with loosely typed fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSnapshot {
    /// Target window title.
    window_title: Option<Value>,
    /// Mode code (`KEY`, `MOUSE`, ...).
    mode: Option<Value>,
    /// Interval as a number or as form text.
    interval: Option<Value>,
    /// Speed unit code (`MS`, `MC`, `NN`).
    speed_mode: Option<Value>,
    /// Click plan, expected to be an array of `{delay, count}` objects.
    delay_clicks: Option<Value>,
    /// Saved counter.
    click_counter: Option<Value>,
}

/// Stored shape written back to disk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredSnapshot<'a> {
    /// Target window title.
    window_title: &'a str,
    /// Mode code.
    mode: SessionMode,
    /// Raw interval number.
    interval: u64,
    /// Speed unit code.
    speed_mode: SpeedUnit,
    /// Click plan.
    delay_clicks: &'a DelayClickSequence,
    /// Saved counter.
    click_counter: u64,
}

/// Coerce a JSON value to an integer the way a lenient number field would.
fn loose_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

/// Non-empty string content of a JSON value.
fn loose_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

impl Snapshot {
    /// Decode a stored document, falling back per field.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::Corrupt(e.to_string()))?;
        if !value.is_object() {
            return Err(Error::Corrupt("expected a JSON object".to_string()));
        }
        let raw: RawSnapshot =
            serde_json::from_value(value).map_err(|e| Error::Corrupt(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    /// Decode `text` when present; any failure yields the defaults.
    pub fn parse_or_default(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return Self::default();
        };
        match Self::parse(text) {
            Ok(snap) => snap,
            Err(e) => {
                warn!(error = %e, "config_snapshot_corrupt_using_defaults");
                Self::default()
            }
        }
    }

    /// Build a snapshot from its parts.
    pub fn new(config: Configuration, click_counter: u64) -> Self {
        Self {
            config,
            click_counter,
        }
    }

    /// Convert the loose document into typed values.
    fn from_raw(raw: RawSnapshot) -> Self {
        let window_title = raw
            .window_title
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mode = raw
            .mode
            .as_ref()
            .and_then(loose_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let unit = raw
            .speed_mode
            .as_ref()
            .and_then(loose_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let interval_raw = raw
            .interval
            .as_ref()
            .and_then(loose_int)
            .filter(|v| *v > 0)
            .map_or(DEFAULT_INTERVAL, |v| v as u64);
        let steps: Vec<DelayClickStep> = raw
            .delay_clicks
            .as_ref()
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        DelayClickStep::from_loose(
                            item.get("delay").and_then(loose_int),
                            item.get("count").and_then(loose_int),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        let sequence = DelayClickSequence::new(steps).unwrap_or_default();
        let click_counter = raw
            .click_counter
            .as_ref()
            .and_then(loose_int)
            .unwrap_or(0)
            .max(0) as u64;

        Self {
            config: Configuration {
                window_title,
                mode,
                interval: IntervalSpec::new(interval_raw, unit),
                sequence,
            },
            click_counter,
        }
    }

    /// Encode to the stored JSON document.
    pub fn to_json(&self) -> Result<String, Error> {
        let stored = StoredSnapshot {
            window_title: &self.config.window_title,
            mode: self.config.mode,
            interval: self.config.interval.raw,
            speed_mode: self.config.interval.unit,
            delay_clicks: &self.config.sequence,
            click_counter: self.click_counter,
        };
        serde_json::to_string_pretty(&stored).map_err(|e| Error::Write {
            path: None,
            message: e.to_string(),
        })
    }
}
