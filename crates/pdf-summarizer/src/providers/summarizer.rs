//! Summarization client trait and shared HTTP plumbing

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Summary text produced by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
}

impl Summary {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Trait for AI summarization backends
///
/// Implementations:
/// - `OllamaSummarizer`: Local Ollama server (phi3, llama3, etc.)
/// - `OpenAiSummarizer`: OpenAI-compatible chat completions API
///
/// Failures are `Error::Summarization` tagged transient or permanent.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Summarize extracted document text
    async fn summarize(&self, content: &str) -> Result<Summary>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

/// Build the reqwest client shared by the HTTP backends
pub(crate) fn build_http_client(config: &LlmConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .pool_max_idle_per_host(5)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Classify a non-success HTTP status from a backend
pub(crate) fn status_error(status: StatusCode, body: &str) -> Error {
    let body = body.trim();
    let message = if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {} - {}", status, truncate_body(body))
    };

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        Error::transient(message)
    } else {
        Error::permanent(message)
    }
}

/// Classify a transport failure from reqwest
pub(crate) fn request_error(err: reqwest::Error) -> Error {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        Error::transient(format!("Request failed: {}", err))
    } else if err.is_decode() {
        Error::permanent(format!("Failed to parse response: {}", err))
    } else {
        Error::permanent(format!("Request failed: {}", err))
    }
}

fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(300) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Retry transient failures with exponential backoff
///
/// Permanent failures return immediately. Delays are 1s, 2s, 4s...
pub(crate) async fn retry_transient<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_base_delay(max_retries, Duration::from_secs(1), operation).await
}

async fn retry_with_base_delay<F, Fut, T>(
    max_retries: u32,
    base_delay: Duration,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt < max_retries => {
                let delay = backoff_delay(base_delay, attempt);
                tracing::warn!(
                    "Summarization request failed (attempt {}/{}), retrying in {:?}: {}",
                    attempt + 1,
                    max_retries + 1,
                    delay,
                    e
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `base * 2^attempt`, saturating instead of overflowing
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn kind(err: &Error) -> FailureKind {
        match err {
            Error::Summarization { kind, .. } => *kind,
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            kind(&status_error(StatusCode::TOO_MANY_REQUESTS, "")),
            FailureKind::Transient
        );
        assert_eq!(
            kind(&status_error(StatusCode::BAD_GATEWAY, "upstream")),
            FailureKind::Transient
        );
        assert_eq!(
            kind(&status_error(StatusCode::UNAUTHORIZED, "bad key")),
            FailureKind::Permanent
        );
        assert_eq!(
            kind(&status_error(StatusCode::NOT_FOUND, "model not found")),
            FailureKind::Permanent
        );
    }

    #[test]
    fn test_status_message_includes_body() {
        let err = status_error(StatusCode::BAD_REQUEST, "context length exceeded");
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("context length exceeded"));
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_base_delay(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::permanent("HTTP 401")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient() {
        let calls = AtomicU32::new(0);
        let result = retry_with_base_delay(3, Duration::from_millis(1), || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(Error::transient("HTTP 503"))
                } else {
                    Ok("summary")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "summary");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_base_delay(2, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::transient("HTTP 503")) }
        })
        .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 32), base * u32::MAX);
        assert_eq!(backoff_delay(Duration::MAX, 5), Duration::MAX);
    }
}
