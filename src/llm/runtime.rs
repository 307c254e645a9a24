use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::Serialize;
use tokio::time::{Instant, sleep};
use tracing::warn;

/// Bounded retry policy for requests that never reached the server.
///
/// Only connect errors are retried. Timeouts and HTTP status replies are
/// final. The default of zero retries issues exactly one request per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 0,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug)]
pub(crate) enum RequestFailure {
    Request(reqwest::Error),
    Api { status: StatusCode, body: String },
}

/// Sends `payload` to `url`, retrying connect failures under `config`.
///
/// Every attempt and every backoff sleep fits inside `deadline`; a retry
/// whose backoff would cross it is not attempted.
pub(crate) async fn send_with_retry<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    headers: &HeaderMap,
    payload: &T,
    config: RetryConfig,
    deadline: Instant,
) -> Result<reqwest::Response, RequestFailure> {
    let max_attempts = config.retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let request = client
            .post(url)
            .headers(headers.clone())
            .json(payload)
            .timeout(remaining);

        match request.send().await {
            Ok(response) => {
                if response.status().is_success() {
                    return Ok(response);
                }

                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(RequestFailure::Api { status, body });
            }
            Err(source) => {
                let delay = retry_delay(attempt, config.retry_delay_ms);
                if should_retry(&source, attempt, max_attempts, Instant::now() + delay, deadline) {
                    warn!(error = %source, attempt = attempt + 1, "retrying generation request");
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                return Err(RequestFailure::Request(source));
            }
        }
    }
}

fn should_retry(
    err: &reqwest::Error,
    attempt: u32,
    max_attempts: u32,
    resume_at: Instant,
    deadline: Instant,
) -> bool {
    err.is_connect() && !err.is_timeout() && attempt + 1 < max_attempts && resume_at < deadline
}

fn retry_delay(attempt: u32, base_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(factor).min(30_000);
    Duration::from_millis(delay_ms)
}
