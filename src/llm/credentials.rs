use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use thiserror::Error;
use tracing::{debug, warn};

/// Metadata server used when `GCE_METADATA_HOST` is not set.
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
/// Environment variable overriding the metadata server host.
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";

const IDENTITY_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/identity";
const METADATA_TIMEOUT: Duration = Duration::from_secs(3);

/// Reasons an identity token could not be obtained.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("identity request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("identity service returned {status}")]
    Status { status: StatusCode },

    #[error("identity service returned an empty token")]
    EmptyToken,

    #[error("identity token is not a valid header value")]
    InvalidToken,
}

/// Ambient source of service identity tokens.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Short name used in log events.
    fn name(&self) -> &str;

    /// Fetches an identity token whose audience is `audience`.
    async fn identity_token(&self, audience: &str) -> Result<String, CredentialError>;
}

/// Identity tokens from the compute metadata server.
///
/// Issues `GET /computeMetadata/v1/instance/service-accounts/default/identity`
/// with the `Metadata-Flavor: Google` header. Outside a cloud runtime the
/// host does not resolve and the fetch fails quickly.
#[derive(Debug, Clone)]
pub struct MetadataIdentity {
    client: reqwest::Client,
    base_url: String,
}

impl MetadataIdentity {
    /// Creates a source for `host`, which may omit the scheme (`host:port`).
    pub fn new(host: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: metadata_base_url(host),
        })
    }
}

fn metadata_base_url(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    let trimmed = if trimmed.is_empty() {
        DEFAULT_METADATA_HOST
    } else {
        trimmed
    };
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

#[async_trait]
impl IdentitySource for MetadataIdentity {
    fn name(&self) -> &str {
        "metadata"
    }

    async fn identity_token(&self, audience: &str) -> Result<String, CredentialError> {
        let url = format!("{}{IDENTITY_PATH}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .query(&[("audience", audience)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CredentialError::Status { status });
        }

        let token = response.text().await?;
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        Ok(token.to_string())
    }
}

/// Builds outgoing request headers, authenticating when possible.
///
/// A failed token fetch never fails the request: the headers are returned
/// without `Authorization` and a `warn` event records why.
#[derive(Clone)]
pub struct CredentialProvider {
    source: Option<Arc<dyn IdentitySource>>,
}

impl CredentialProvider {
    pub fn new(source: Arc<dyn IdentitySource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// A provider that never attempts a token fetch.
    pub fn disabled() -> Self {
        Self { source: None }
    }

    /// Returns headers for a request to `target_url`.
    ///
    /// Always contains `Content-Type: application/json`. Contains
    /// `Authorization: Bearer <token>` only when the identity source
    /// produced a token on this single attempt.
    pub async fn headers(&self, target_url: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let Some(source) = &self.source else {
            debug!(audience = target_url, "identity disabled, sending unauthenticated request");
            return headers;
        };

        let token = source.identity_token(target_url).await;
        match token.and_then(|token| bearer_value(&token)) {
            Ok(value) => {
                debug!(audience = target_url, identity = source.name(), "attached identity token");
                headers.insert(AUTHORIZATION, value);
            }
            Err(err) => {
                warn!(
                    audience = target_url,
                    identity = source.name(),
                    error = %err,
                    "identity token unavailable, sending unauthenticated request"
                );
            }
        }
        headers
    }
}

impl fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("source", &self.source.as_ref().map(|source| source.name()))
            .finish()
    }
}

fn bearer_value(token: &str) -> Result<HeaderValue, CredentialError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| CredentialError::InvalidToken)?;
    value.set_sensitive(true);
    Ok(value)
}
