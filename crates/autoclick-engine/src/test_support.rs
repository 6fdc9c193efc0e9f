//! Test support utilities for autoclick-engine unit and integration tests.
//! These helpers are public to avoid dead_code warnings and are lightweight.
//! They are intended for use by the test suite only.

use std::{future, sync::Arc, time::Duration};

use async_trait::async_trait;
use autoclick_protocol::{BackendRequest, UiEvent, ipc::UiRx};
use config::{
    Configuration, DelayClickSequence, DelayClickStep, IntervalSpec, SessionMode, SpeedUnit,
};
use parking_lot::Mutex;
use tokio::time;

use crate::{Backend, error::BackendError};

/// How [`MockBackend`] answers a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Accept.
    Accept,
    /// Fail with the given error.
    Fail(BackendError),
    /// Never answer.
    Hang,
}

/// In-memory backend that records every request.
pub struct MockBackend {
    requests: Mutex<Vec<BackendRequest>>,
    start_reply: Mutex<MockReply>,
    neutralize_reply: Mutex<MockReply>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Backend that accepts everything.
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            start_reply: Mutex::new(MockReply::Accept),
            neutralize_reply: Mutex::new(MockReply::Accept),
        }
    }

    /// Shared handle, ready to pass to the engine.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Set the reply for start requests.
    pub fn reply_to_start(&self, reply: MockReply) {
        *self.start_reply.lock() = reply;
    }

    /// Set the reply for neutralizing requests.
    pub fn reply_to_neutralize(&self, reply: MockReply) {
        *self.neutralize_reply.lock() = reply;
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().clone()
    }

    /// Most recent request.
    pub fn last(&self) -> Option<BackendRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn send(&self, request: &BackendRequest) -> Result<(), BackendError> {
        self.requests.lock().push(request.clone());
        let reply = if request.is_neutral() {
            self.neutralize_reply.lock().clone()
        } else {
            self.start_reply.lock().clone()
        };
        match reply {
            MockReply::Accept => Ok(()),
            MockReply::Fail(e) => Err(e),
            MockReply::Hang => future::pending().await,
        }
    }
}

/// Build a configuration targeting `title` with a millisecond interval.
pub fn config_for(
    title: &str,
    mode: SessionMode,
    interval_ms: u64,
    steps: &[(u64, u32)],
) -> Configuration {
    let steps = steps
        .iter()
        .map(|&(delay, count)| DelayClickStep::new(delay, count))
        .collect();
    Configuration {
        window_title: title.to_string(),
        mode,
        interval: IntervalSpec::new(interval_ms, SpeedUnit::Milliseconds),
        sequence: DelayClickSequence::new(steps).unwrap_or_default(),
    }
}

/// Receive events until `pred` matches, up to `timeout_ms`.
pub async fn recv_until<F>(rx: &mut UiRx, timeout_ms: u64, mut pred: F) -> bool
where
    F: FnMut(&UiEvent) -> bool,
{
    time::timeout(Duration::from_millis(timeout_ms), async {
        while let Some(ev) = rx.recv().await {
            if pred(&ev) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

/// Drain every event currently queued.
pub fn drain(rx: &mut UiRx) -> Vec<UiEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}
