//! Inference session: readiness polling, dispatch, retry and backoff.
//!
//! The session is an explicit object with its lifecycle bound to one
//! batch run — the orchestrator creates it, drives it to `Ready`, and
//! issues generation requests through it one at a time. Nothing here is
//! process-global, so tests swap in a mock [`InferenceBackend`] and
//! exercise the full state machine without a running service.
//!
//! ## Session states
//!
//! ```text
//! Unchecked ──health ok──▶ Ready ──▶ Ready ──▶ … (one state per batch)
//!     │
//!     └─startup timeout──▶ Unavailable (terminal, fails the run)
//! ```
//!
//! ## Retry strategy
//!
//! Transient failures (connect errors, 5xx, per-request timeout) retry
//! with exponential backoff: `retry_backoff_ms * 2^(attempt-1)`, so the
//! default 1 s base waits 1 s → 2 s → 4 s across three retries. A
//! malformed response body is failed immediately — retrying cannot fix a
//! parsing mismatch. Either way the session stays `Ready` and the batch
//! moves on to the next document.

use crate::config::PipelineConfig;
use crate::document::GenerationRequest;
use crate::error::{DocError, DocGenError};
use crate::output::GenerationResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Failure classes a backend reports; the class decides the retry policy.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Network or server-side failure expected to be retried.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The service answered but the body could not be parsed. Never
    /// retried.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The service refused the request (4xx other than 429). Never
    /// retried.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Transport to a generation service.
///
/// [`OllamaBackend`] is the production implementation; tests inject
/// mocks via [`PipelineConfig::backend`] to drive the client state
/// machine with scripted failures.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// One readiness probe. `Ok(())` means the service can accept
    /// generation requests.
    async fn health(&self) -> Result<(), BackendError>;

    /// One generation attempt. Classification of failures into
    /// [`BackendError`] variants is the backend's responsibility.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}

// ── Ollama HTTP backend ──────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: i64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// [`InferenceBackend`] over Ollama's HTTP API.
///
/// Readiness probes `GET /api/tags`; generation posts to
/// `POST /api/generate` with `stream: false` so the full text arrives in
/// one deterministic body.
pub struct OllamaBackend {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaBackend {
    /// `request_timeout` bounds each generation call; a timed-out call
    /// surfaces as [`BackendError::Transient`].
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self, DocGenError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DocGenError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    async fn health(&self) -> Result<(), BackendError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map_err(|e| BackendError::Transient(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Transient(format!(
                "health endpoint returned HTTP {}",
                resp.status()
            )))
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateBody {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens as i64,
            },
        };

        let resp = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Transient("request timed out".to_string())
            } else {
                BackendError::Transient(e.to_string())
            }
        })?;

        let status = resp.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(BackendError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(BackendError::Rejected(format!("HTTP {status}")));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| BackendError::Transient(format!("failed to read body: {e}")))?;
        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| BackendError::Malformed(format!("{e}")))?;
        Ok(parsed.response)
    }
}

// ── Session state machine ────────────────────────────────────────────────

/// Lifecycle state of one batch's inference session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Initial: no health probe has succeeded yet.
    Unchecked,
    /// The service answered a health probe; requests may be dispatched.
    Ready,
    /// Readiness was not achieved within the startup window. Terminal.
    Unavailable,
}

/// One batch's session against the inference service.
///
/// Requests are serialized by the `&mut self` receivers: one in-flight
/// generation at a time, even when extraction workers run in parallel.
pub struct InferenceClient {
    backend: Arc<dyn InferenceBackend>,
    state: SessionState,
    endpoint: String,
    startup_timeout: Duration,
    poll_interval: Duration,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl InferenceClient {
    /// Build a client from the run configuration. Uses the injected
    /// backend when present, otherwise an [`OllamaBackend`] against
    /// `config.endpoint`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, DocGenError> {
        let backend: Arc<dyn InferenceBackend> = match &config.backend {
            Some(b) => Arc::clone(b),
            None => Arc::new(OllamaBackend::new(
                &config.endpoint,
                Duration::from_secs(config.request_timeout_secs),
            )?),
        };
        Ok(Self {
            backend,
            state: SessionState::Unchecked,
            endpoint: config.endpoint.clone(),
            startup_timeout: Duration::from_secs(config.startup_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Poll the health endpoint until the service is ready or the
    /// startup window closes.
    ///
    /// At least one probe is always made, even with a zero timeout. A
    /// probe still in flight when the window closes is abandoned; the
    /// service sees at most one outstanding probe at a time.
    pub async fn ensure_ready(&mut self) -> Result<(), DocGenError> {
        match self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Unavailable => {
                return Err(self.unavailable());
            }
            SessionState::Unchecked => {}
        }

        let started = Instant::now();
        let deadline = started + self.startup_timeout;
        let mut probes = 0u32;

        loop {
            probes += 1;
            let budget = deadline
                .saturating_duration_since(Instant::now())
                .max(self.poll_interval);
            match timeout(budget, self.backend.health()).await {
                Ok(Ok(())) => {
                    info!(
                        endpoint = %self.endpoint,
                        probes,
                        waited_ms = started.elapsed().as_millis() as u64,
                        "inference service is ready"
                    );
                    self.state = SessionState::Ready;
                    return Ok(());
                }
                Ok(Err(e)) => {
                    debug!(probes, "service not ready yet: {e}");
                }
                Err(_) => {
                    debug!(probes, "readiness probe timed out");
                }
            }

            if Instant::now() >= deadline {
                self.state = SessionState::Unavailable;
                return Err(self.unavailable());
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Dispatch one generation request and drive it to a terminal
    /// result.
    ///
    /// Refused without touching the service unless the session is
    /// `Ready`. Latency covers dispatch to terminal resolution,
    /// including backoff waits. The session stays `Ready` whatever the
    /// outcome, so subsequent documents proceed.
    pub async fn generate(&mut self, request: &GenerationRequest) -> GenerationResult {
        if self.state != SessionState::Ready {
            return GenerationResult::failure(&request.identifier, DocError::SessionNotReady, 0, 0);
        }

        let started = Instant::now();
        let mut last_err = String::new();
        let mut attempts = 0u32;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms.saturating_mul(2u64.pow(attempt - 1));
                warn!(
                    identifier = %request.identifier,
                    retry = attempt,
                    max_retries = self.max_retries,
                    backoff_ms = backoff,
                    "retrying generation"
                );
                sleep(Duration::from_millis(backoff)).await;
            }
            attempts = attempt + 1;

            match self.backend.generate(request).await {
                Ok(text) => {
                    let latency = started.elapsed().as_millis() as u64;
                    debug!(
                        identifier = %request.identifier,
                        latency_ms = latency,
                        attempts,
                        chars = text.len(),
                        "generation succeeded"
                    );
                    return GenerationResult::success(
                        &request.identifier,
                        text,
                        request.truncated,
                        latency,
                        attempts,
                    );
                }
                Err(BackendError::Transient(detail)) => {
                    warn!(
                        identifier = %request.identifier,
                        attempt = attempts,
                        "transient inference failure: {detail}"
                    );
                    last_err = detail;
                }
                Err(BackendError::Malformed(detail)) => {
                    return GenerationResult::failure(
                        &request.identifier,
                        DocError::MalformedResponse { detail },
                        started.elapsed().as_millis() as u64,
                        attempts,
                    );
                }
                Err(BackendError::Rejected(detail)) => {
                    return GenerationResult::failure(
                        &request.identifier,
                        DocError::InferenceFailed { attempts, detail },
                        started.elapsed().as_millis() as u64,
                        attempts,
                    );
                }
            }
        }

        GenerationResult::failure(
            &request.identifier,
            DocError::InferenceFailed {
                attempts,
                detail: last_err,
            },
            started.elapsed().as_millis() as u64,
            attempts,
        )
    }

    fn unavailable(&self) -> DocGenError {
        DocGenError::ServiceUnavailable {
            endpoint: self.endpoint.clone(),
            waited_secs: self.startup_timeout.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted backend: counts calls, fails health `healthy_after`
    /// times, and always answers generation per `mode`.
    struct ScriptedBackend {
        health_calls: AtomicU32,
        generate_calls: AtomicU32,
        healthy_after: u32,
        mode: Mode,
    }

    enum Mode {
        Succeed(&'static str),
        Transient,
        Malformed,
    }

    impl ScriptedBackend {
        fn new(healthy_after: u32, mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                health_calls: AtomicU32::new(0),
                generate_calls: AtomicU32::new(0),
                healthy_after,
                mode,
            })
        }
    }

    #[async_trait]
    impl InferenceBackend for ScriptedBackend {
        async fn health(&self) -> Result<(), BackendError> {
            let n = self.health_calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.healthy_after {
                Ok(())
            } else {
                Err(BackendError::Transient("not yet".into()))
            }
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                Mode::Succeed(s) => Ok(s.to_string()),
                Mode::Transient => Err(BackendError::Transient("boom".into())),
                Mode::Malformed => Err(BackendError::Malformed("not json".into())),
            }
        }
    }

    fn fast_client(backend: Arc<dyn InferenceBackend>) -> InferenceClient {
        let config = PipelineConfig::builder()
            .backend(backend)
            .startup_timeout_secs(2)
            .poll_interval_ms(1)
            .retry_backoff_ms(1)
            .build()
            .unwrap();
        InferenceClient::from_config(&config).unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            identifier: "doc-1".into(),
            prompt: "Context:\nx\n\nTask: y".into(),
            truncated: false,
            model: "llama3".into(),
            max_tokens: 64,
            temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn becomes_ready_after_polling() {
        let backend = ScriptedBackend::new(3, Mode::Succeed("OK"));
        let mut client = fast_client(backend.clone());
        assert_eq!(client.state(), SessionState::Unchecked);

        client.ensure_ready().await.unwrap();
        assert_eq!(client.state(), SessionState::Ready);
        assert_eq!(backend.health_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn never_ready_is_terminal() {
        let backend = ScriptedBackend::new(u32::MAX, Mode::Succeed("OK"));
        let config = PipelineConfig::builder()
            .backend(backend.clone())
            .startup_timeout_secs(0)
            .poll_interval_ms(1)
            .build()
            .unwrap();
        let mut client = InferenceClient::from_config(&config).unwrap();

        let err = client.ensure_ready().await.unwrap_err();
        assert!(matches!(err, DocGenError::ServiceUnavailable { .. }));
        assert_eq!(client.state(), SessionState::Unavailable);

        // Terminal: a second call fails without probing again.
        let probes = backend.health_calls.load(Ordering::SeqCst);
        assert!(client.ensure_ready().await.is_err());
        assert_eq!(backend.health_calls.load(Ordering::SeqCst), probes);
    }

    #[tokio::test]
    async fn generate_refused_before_ready() {
        let backend = ScriptedBackend::new(0, Mode::Succeed("OK"));
        let mut client = fast_client(backend.clone());

        let result = client.generate(&request()).await;
        assert!(!result.is_success());
        assert!(matches!(result.error, Some(DocError::SessionNotReady)));
        // The backend was never touched.
        assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transient_failure_retries_exactly_max_retries() {
        let backend = ScriptedBackend::new(0, Mode::Transient);
        let mut client = fast_client(backend.clone());
        client.ensure_ready().await.unwrap();

        let result = client.generate(&request()).await;
        assert!(!result.is_success());
        match result.error {
            Some(DocError::InferenceFailed { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("expected InferenceFailed, got {other:?}"),
        }
        // 1 initial attempt + max_retries (3) retries.
        assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 4);
        assert_eq!(client.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn malformed_response_is_not_retried() {
        let backend = ScriptedBackend::new(0, Mode::Malformed);
        let mut client = fast_client(backend.clone());
        client.ensure_ready().await.unwrap();

        let result = client.generate(&request()).await;
        assert!(matches!(result.error, Some(DocError::MalformedResponse { .. })));
        assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn success_records_latency_and_attempts() {
        let backend = ScriptedBackend::new(0, Mode::Succeed("a fine description"));
        let mut client = fast_client(backend);
        client.ensure_ready().await.unwrap();

        let result = client.generate(&request()).await;
        assert!(result.is_success());
        assert_eq!(result.generated_text.as_deref(), Some("a fine description"));
        assert_eq!(result.attempts, 1);
    }
}
