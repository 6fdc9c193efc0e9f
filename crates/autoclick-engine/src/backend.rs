//! Transport to the automation backend.

use std::time::Duration;

use async_trait::async_trait;
use autoclick_protocol::{BackendRequest, Endpoint};
use tracing::{debug, warn};

use crate::error::BackendError;

/// Something that can deliver a configuration to the automation backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Deliver `request`; success means the backend accepted it.
    async fn send(&self, request: &BackendRequest) -> Result<(), BackendError>;
}

/// HTTP backend posting JSON bodies under a base URL.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBackend {
    /// Client for `base_url` whose requests give up after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of `endpoint`.
    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.as_str())
    }

    fn classify(&self, err: &reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send(&self, request: &BackendRequest) -> Result<(), BackendError> {
        let url = self.url(Endpoint::Start);
        debug!(%url, title = %request.title, neutral = request.is_neutral(), "backend_send");
        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            warn!(%url, status = status.as_u16(), "backend_rejected");
            Err(BackendError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{Json, Router, http::StatusCode, routing::post};
    use config::{Configuration, SessionMode};
    use parking_lot::Mutex;
    use tokio::net::TcpListener;

    use super::*;

    async fn serve(status: StatusCode) -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let app = Router::new().route(
            "/api/autoclick/start",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().push(body);
                    status
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        (format!("http://{addr}/api/"), seen)
    }

    #[tokio::test]
    async fn posts_camel_case_body() {
        let (base, seen) = serve(StatusCode::OK).await;
        let backend = HttpBackend::new(base, Duration::from_secs(5)).expect("client");
        assert!(backend.url(Endpoint::Start).ends_with("/api/autoclick/start"));

        let config = Configuration {
            window_title: "Game".into(),
            mode: SessionMode::Auto,
            ..Configuration::default()
        };
        backend
            .send(&BackendRequest::start(&config))
            .await
            .expect("accepted");

        let bodies = seen.lock().clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["title"], "Game");
        assert_eq!(bodies[0]["mode"], "AUTO");
        assert_eq!(bodies[0]["speedMode"], "MS");
        assert_eq!(bodies[0]["delayClicks"][0]["count"], 10);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (base, _seen) = serve(StatusCode::INTERNAL_SERVER_ERROR).await;
        let backend = HttpBackend::new(base, Duration::from_secs(5)).expect("client");
        let err = backend
            .send(&BackendRequest::neutralize("x", SessionMode::Key))
            .await
            .expect_err("rejected");
        assert_eq!(err, BackendError::Status(500));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let backend =
            HttpBackend::new(format!("http://{addr}/api"), Duration::from_secs(5)).expect("client");
        let err = backend
            .send(&BackendRequest::neutralize("x", SessionMode::Key))
            .await
            .expect_err("unreachable");
        assert!(matches!(err, BackendError::Transport(_)), "{err:?}");
    }
}
