//! Payloads exchanged with the automation backend.
//!
//! The backend exposes a single JSON endpoint. Starting a session and halting a
//! running one both post a [`BackendRequest`]; halting uses the neutralizing form
//! built by [`BackendRequest::neutralize`].

use config::{Configuration, SessionMode, SpeedUnit};
use serde::{Deserialize, Serialize};

/// Title sent when neutralizing without a usable window title.
pub const NEUTRAL_TITLE: &str = "dummy";

/// HTTP endpoints exposed by the automation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Install a click configuration (also used to halt with a zero-count plan).
    Start,
}

impl Endpoint {
    /// Path relative to the backend base URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "autoclick/start",
        }
    }
}

/// One step of the click plan as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDelayClick {
    /// Delay before the step, in milliseconds.
    pub delay: u64,
    /// Clicks in the step; zero only in neutralizing payloads.
    pub count: u32,
}

/// Start/stop request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendRequest {
    /// Target window title.
    pub title: String,
    /// Trigger mode.
    pub mode: SessionMode,
    /// Raw interval number in `speed_mode` units.
    pub interval: u64,
    /// Unit of `interval`.
    pub speed_mode: SpeedUnit,
    /// Click plan.
    pub delay_clicks: Vec<WireDelayClick>,
}

impl BackendRequest {
    /// Build the request that starts remote execution of `config`.
    pub fn start(config: &Configuration) -> Self {
        Self {
            title: config.window_title.trim().to_string(),
            mode: config.mode,
            interval: config.interval.raw,
            speed_mode: config.interval.unit,
            delay_clicks: config
                .sequence
                .iter()
                .map(|s| WireDelayClick {
                    delay: s.delay_ms(),
                    count: s.count(),
                })
                .collect(),
        }
    }

    /// Build the zero-click request that halts remote execution.
    pub fn neutralize(title: &str, mode: SessionMode) -> Self {
        let title = title.trim();
        Self {
            title: if title.is_empty() {
                NEUTRAL_TITLE.to_string()
            } else {
                title.to_string()
            },
            mode,
            interval: 1,
            speed_mode: SpeedUnit::Milliseconds,
            delay_clicks: vec![WireDelayClick { delay: 0, count: 0 }],
        }
    }

    /// True when this request carries no clicks at all.
    pub fn is_neutral(&self) -> bool {
        self.delay_clicks.iter().all(|s| s.count == 0)
    }
}

#[cfg(test)]
mod tests {
    use config::{DelayClickSequence, IntervalSpec};
    use serde_json::json;

    use super::*;

    #[test]
    fn start_payload_matches_wire_shape() {
        let config = Configuration {
            window_title: "  Game  ".into(),
            mode: SessionMode::Auto,
            interval: IntervalSpec::new(500, SpeedUnit::Microseconds),
            sequence: DelayClickSequence::default().with_step(25, 2),
        };
        let req = BackendRequest::start(&config);
        assert!(!req.is_neutral());
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "title": "Game",
                "mode": "AUTO",
                "interval": 500,
                "speedMode": "MC",
                "delayClicks": [{"delay": 0, "count": 10}, {"delay": 25, "count": 2}]
            })
        );
    }

    #[test]
    fn neutralizing_payload_is_canonical() {
        let req = BackendRequest::neutralize("   ", SessionMode::Mouse);
        assert!(req.is_neutral());
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "title": "dummy",
                "mode": "MOUSE",
                "interval": 1,
                "speedMode": "MS",
                "delayClicks": [{"delay": 0, "count": 0}]
            })
        );
        assert_eq!(BackendRequest::neutralize("Win", SessionMode::Key).title, "Win");
    }
}
