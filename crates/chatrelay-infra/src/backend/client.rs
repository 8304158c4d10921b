//! HttpGenerationClient -- concrete [`GenerationBackend`] over HTTP + SSE.
//!
//! Manages one long-lived HTTP client to the generation backend with a
//! `Disconnected -> Connecting -> Ready -> (per call) Streaming -> Ready`
//! lifecycle. Connection establishment resolves the endpoint (discovery
//! lookup with fallback to the static address), probes backend health, and
//! retries on a fixed delay up to the configured attempt ceiling; after
//! that the whole client initialization fails, never silently degrading.
//!
//! Call-level retries for transient failures use the independent
//! exponential-backoff policy in [`super::retry`]; the two retry loops
//! guard different failure classes and are never merged.
//!
//! The optional backend bearer token comes from `CHATRELAY_BACKEND_TOKEN`
//! and is wrapped in [`secrecy::SecretString`], never logged.

use std::fmt;
use std::sync::RwLock;
use std::time::Duration;

use chatrelay_core::generation::{ChunkStream, GenerationBackend};
use chatrelay_types::config::BackendConfig;
use chatrelay_types::generation::{GenerationError, GenerationRequest};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use super::retry::retry_transient;
use super::streaming::map_sse_stream;
use super::types::{DiscoveryResponse, GenerateRequestBody, GenerateResponseBody};

/// Environment variable holding the optional backend bearer token.
const TOKEN_ENV: &str = "CHATRELAY_BACKEND_TOKEN";

/// Connection lifecycle, tracked for logs and health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Streaming,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Ready => write!(f, "ready"),
            ConnectionState::Streaming => write!(f, "streaming"),
        }
    }
}

/// HTTP client for the streaming text-generation backend.
#[derive(Debug)]
pub struct HttpGenerationClient {
    client: reqwest::Client,
    endpoint: String,
    config: BackendConfig,
    auth_token: Option<SecretString>,
    state: RwLock<ConnectionState>,
}

impl HttpGenerationClient {
    /// Resolve the endpoint, probe backend health, and build the client.
    ///
    /// Fails with [`GenerationError::ConnectFailed`] after exhausting the
    /// connection attempt ceiling.
    pub async fn connect(config: BackendConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| GenerationError::Backend {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let auth_token = std::env::var(TOKEN_ENV).ok().map(SecretString::from);

        let this = Self {
            client,
            endpoint: config.endpoint.clone(),
            config,
            auth_token,
            state: RwLock::new(ConnectionState::Disconnected),
        };
        let endpoint = this.resolve_endpoint().await;
        let this = Self { endpoint, ..this };

        this.set_state(ConnectionState::Connecting);
        this.probe_until_ready().await?;
        this.set_state(ConnectionState::Ready);
        info!(endpoint = %this.endpoint, "generation backend connected");
        Ok(this)
    }

    /// The resolved backend endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Discovery lookup with fallback to the static endpoint.
    async fn resolve_endpoint(&self) -> String {
        let Some(discovery_url) = self.config.discovery_url.as_deref() else {
            return self.config.endpoint.clone();
        };

        let result = self
            .client
            .get(discovery_url)
            .timeout(Duration::from_millis(self.config.connect_timeout_ms))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                match response.json::<DiscoveryResponse>().await {
                    Ok(discovered) => {
                        debug!(endpoint = %discovered.endpoint, "endpoint resolved via discovery");
                        discovered.endpoint
                    }
                    Err(err) => {
                        warn!(%err, "discovery response malformed, using static endpoint");
                        self.config.endpoint.clone()
                    }
                }
            }
            Ok(response) => {
                warn!(status = %response.status(), "discovery lookup failed, using static endpoint");
                self.config.endpoint.clone()
            }
            Err(err) => {
                warn!(%err, "discovery lookup unreachable, using static endpoint");
                self.config.endpoint.clone()
            }
        }
    }

    /// Health-probe loop with a fixed inter-attempt delay.
    async fn probe_until_ready(&self) -> Result<(), GenerationError> {
        let attempts = self.config.connect_attempts.max(1);
        let url = format!("{}/healthz", self.endpoint);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let result = self
                .request(reqwest::Method::GET, &url)
                .timeout(Duration::from_millis(self.config.connect_timeout_ms))
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    last_error = format!("health probe returned HTTP {}", response.status());
                }
                Err(err) => {
                    last_error = err.to_string();
                }
            }

            warn!(attempt, attempts, error = %last_error, "backend connection attempt failed");
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(self.config.connect_retry_delay_ms)).await;
            }
        }

        self.set_state(ConnectionState::Disconnected);
        Err(GenerationError::ConnectFailed {
            attempts,
            message: last_error,
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *state != next {
            debug!(from = %*state, to = %next, "backend connection state");
            *state = next;
        }
    }

    async fn generate_once(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body: GenerateRequestBody = request.clone().into();
        let url = format!("{}/v1/generate", self.endpoint);

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let response = check_status(response).await?;
        let parsed: GenerateResponseBody = response
            .json()
            .await
            .map_err(|e| GenerationError::Deserialization(format!("generate response: {e}")))?;
        Ok(parsed.text)
    }

    async fn open_stream_once(
        &self,
        request: &GenerationRequest,
    ) -> Result<reqwest::Response, GenerationError> {
        let body: GenerateRequestBody = request.clone().into();
        let url = format!("{}/v1/generate/stream", self.endpoint);

        let response = self
            .request(reqwest::Method::POST, &url)
            .header("accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        check_status(response).await
    }
}

impl GenerationBackend for HttpGenerationClient {
    fn name(&self) -> &str {
        "http-generation"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        retry_transient(&self.config.retry, "generate", || {
            self.generate_once(&request)
        })
        .await
    }

    async fn stream(&self, request: GenerationRequest) -> Result<ChunkStream, GenerationError> {
        self.set_state(ConnectionState::Streaming);
        // Retry covers establishment only; a stream that breaks after the
        // first byte surfaces as an error item and is never re-run.
        let result = retry_transient(&self.config.retry, "stream", || {
            self.open_stream_once(&request)
        })
        .await;
        self.set_state(ConnectionState::Ready);

        Ok(map_sse_stream(result?))
    }
}

/// Map reqwest transport failures onto the error taxonomy.
fn classify_transport(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::DeadlineExceeded
    } else if err.is_connect() {
        GenerationError::Unavailable(err.to_string())
    } else {
        GenerationError::Backend {
            message: err.to_string(),
        }
    }
}

/// Map non-success HTTP statuses onto the error taxonomy.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        503 => GenerationError::Unavailable(body),
        408 | 504 => GenerationError::DeadlineExceeded,
        429 | 507 | 529 => GenerationError::Overloaded(body),
        _ => GenerationError::Backend {
            message: format!("HTTP {status}: {body}"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> BackendConfig {
        BackendConfig {
            // Discard-port endpoint: connections are refused immediately.
            endpoint: "http://127.0.0.1:9".to_string(),
            discovery_url: None,
            connect_timeout_ms: 200,
            connect_attempts: 2,
            connect_retry_delay_ms: 1,
            request_timeout_ms: 500,
            retry: Default::default(),
        }
    }

    #[tokio::test]
    async fn connect_fails_after_attempt_ceiling() {
        let err = HttpGenerationClient::connect(fast_config()).await.unwrap_err();
        match err {
            GenerationError::ConnectFailed { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected ConnectFailed, got {other:?}"),
        }
    }

    #[test]
    fn connection_state_display() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionState::Streaming.to_string(), "streaming");
    }

    #[tokio::test]
    async fn status_503_maps_to_unavailable() {
        let response = http::Response::builder()
            .status(503)
            .body("down for maintenance")
            .unwrap();
        let err = check_status(reqwest::Response::from(response))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn status_429_maps_to_overloaded() {
        let response = http::Response::builder().status(429).body("slow down").unwrap();
        let err = check_status(reqwest::Response::from(response))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Overloaded(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn status_500_maps_to_backend() {
        let response = http::Response::builder().status(500).body("boom").unwrap();
        let err = check_status(reqwest::Response::from(response))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Backend { .. }));
    }
}
