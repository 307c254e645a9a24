use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::config::ConfigError;
use crate::llm::credentials::CredentialProvider;
use crate::llm::runtime::{RequestFailure, RetryConfig, send_with_retry};

/// Model requested when no other model is configured.
pub const DEFAULT_MODEL: &str = "gemma3:4b";
/// Sampling temperature used when the caller has no preference.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Total per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Text returned when the endpoint replies without a `response` field.
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response from model";

const GENERATE_PATH: &str = "/api/generate";

/// Construction parameters for [`GenerationClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
    total_duration: Option<u64>,
}

/// Token accounting reported by the endpoint, when it reports any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_duration_ns: Option<u64>,
}

/// Successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Model text, or [`NO_RESPONSE_PLACEHOLDER`].
    pub text: String,
    /// True when the reply had no `response` field.
    pub placeholder: bool,
    pub usage: Option<Usage>,
}

/// Failure of a single generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Error connecting to LLM: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("LLM request timed out after {timeout:?}")]
    Timeout {
        timeout: Duration,
        #[source]
        source: reqwest::Error,
    },

    #[error("LLM API error {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Malformed response from LLM: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("Generation client is closed")]
    Closed,
}

/// Coarse classification of [`GenerationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    Transport,
    Timeout,
    Status,
    MalformedResponse,
    Closed,
}

impl GenerationErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::Status => "status",
            Self::MalformedResponse => "malformed_response",
            Self::Closed => "closed",
        }
    }
}

impl GenerationError {
    pub fn kind(&self) -> GenerationErrorKind {
        match self {
            Self::Transport(_) => GenerationErrorKind::Transport,
            Self::Timeout { .. } => GenerationErrorKind::Timeout,
            Self::Status { .. } => GenerationErrorKind::Status,
            Self::MalformedResponse(_) => GenerationErrorKind::MalformedResponse,
            Self::Closed => GenerationErrorKind::Closed,
        }
    }
}

/// Client for a remote `/api/generate` endpoint.
///
/// One instance is built at startup and shared by reference (usually behind
/// an `Arc`). Concurrent `generate` calls share only the connection pool.
#[derive(Debug)]
pub struct GenerationClient {
    endpoint: String,
    generate_url: String,
    model: String,
    timeout: Duration,
    retry: RetryConfig,
    credentials: CredentialProvider,
    http: RwLock<Option<reqwest::Client>>,
}

impl GenerationClient {
    /// Builds a client for `config.endpoint`.
    ///
    /// Trailing slashes are stripped from the endpoint. An empty endpoint is
    /// [`ConfigError::MissingEndpoint`].
    pub fn new(config: ClientConfig, credentials: CredentialProvider) -> Result<Self, ConfigError> {
        let endpoint = normalize_endpoint(&config.endpoint)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            generate_url: format!("{endpoint}{GENERATE_PATH}"),
            endpoint,
            model: config.model,
            timeout: config.timeout,
            retry: config.retry,
            credentials,
            http: RwLock::new(Some(http)),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn generate_url(&self) -> &str {
        &self.generate_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// JSON body `generate` would send for these arguments.
    pub fn request_body(&self, prompt: &str, temperature: f64) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "temperature": clamp_temperature(temperature),
        })
    }

    /// Runs one generation round trip.
    ///
    /// Never panics and never retries a status reply. A reply without a
    /// `response` field yields [`NO_RESPONSE_PLACEHOLDER`].
    #[instrument(
        name = "generate",
        skip(self, prompt),
        fields(model = %self.model, prompt_chars = prompt.chars().count())
    )]
    pub async fn generate(&self, prompt: &str, temperature: f64) -> Result<Generation, GenerationError> {
        let result = self.round_trip(prompt, clamp_temperature(temperature)).await;
        if let Err(err) = &result {
            error!(kind = err.kind().as_str(), error = %err, "generation failed");
        }
        result
    }

    async fn round_trip(&self, prompt: &str, temperature: f64) -> Result<Generation, GenerationError> {
        let http = self.http_client()?;
        let payload = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            temperature,
        };
        let headers = self.credentials.headers(&self.endpoint).await;

        info!(url = %self.generate_url, temperature, "querying generation endpoint");
        let deadline = Instant::now() + self.timeout;
        let response = send_with_retry(
            &http,
            &self.generate_url,
            &headers,
            &payload,
            self.retry,
            deadline,
        )
        .await
            .map_err(|failure| match failure {
                RequestFailure::Request(source) => self.request_error(source),
                RequestFailure::Api { status, body } => GenerationError::Status { status, body },
            })?;

        let body = response
            .text()
            .await
            .map_err(|source| self.request_error(source))?;
        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(GenerationError::MalformedResponse)?;

        let usage = (parsed.prompt_eval_count.is_some()
            || parsed.eval_count.is_some()
            || parsed.total_duration.is_some())
        .then_some(Usage {
            prompt_tokens: parsed.prompt_eval_count,
            completion_tokens: parsed.eval_count,
            total_duration_ns: parsed.total_duration,
        });

        let generation = match parsed.response {
            Some(text) => Generation {
                text,
                placeholder: false,
                usage,
            },
            None => {
                debug!("reply had no response field");
                Generation {
                    text: NO_RESPONSE_PLACEHOLDER.to_string(),
                    placeholder: true,
                    usage,
                }
            }
        };
        Ok(generation)
    }

    fn request_error(&self, source: reqwest::Error) -> GenerationError {
        if source.is_timeout() {
            GenerationError::Timeout {
                timeout: self.timeout,
                source,
            }
        } else {
            GenerationError::Transport(source)
        }
    }

    fn http_client(&self) -> Result<reqwest::Client, GenerationError> {
        self.http
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(GenerationError::Closed)
    }

    /// Releases the connection pool. Safe to call more than once.
    ///
    /// Requests already in flight finish on their own handle; later calls
    /// to `generate` return [`GenerationError::Closed`].
    pub fn close(&self) {
        let released = self
            .http
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            debug!(endpoint = %self.endpoint, "generation client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.http
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

fn normalize_endpoint(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::MissingEndpoint);
    }

    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        value: raw.trim().to_string(),
        reason,
    };
    let url = Url::parse(trimmed).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query strings and fragments are not allowed".to_string()));
    }
    Ok(trimmed.to_string())
}

fn clamp_temperature(temperature: f64) -> f64 {
    if temperature.is_nan() {
        DEFAULT_TEMPERATURE
    } else {
        temperature.clamp(0.0, 1.0)
    }
}
