//! Retrying HTTP transport: `MAX_RETRIES` default 5, `INITIAL_BACKOFF`
//! default 2s doubling. Only HTTP 429 and request timeout are
//! retryable; any 5xx propagates immediately as fatal for this
//! pipeline run rather than being retried.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::LlmError;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(2);

pub struct HttpClient {
    client: Client,
    max_retries: u32,
    initial_backoff: Duration,
}

impl HttpClient {
    pub fn new() -> Self {
        HttpClient {
            client: Client::builder()
                .build()
                .expect("reqwest client with default TLS backend should always build"),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }

    pub fn with_retry_policy(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Executes one logical request, retrying on 429 and on timeout up
    /// to `max_retries` times with doubling backoff. Any other
    /// non-success status is returned to the caller immediately as a
    /// `Transport` error — no retry.
    pub async fn execute_with_retry<F>(
        &self,
        provider: &str,
        timeout: Duration,
        build_request: F,
    ) -> Result<reqwest::Response, LlmError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0u32;
        let mut backoff = self.initial_backoff;

        loop {
            attempt += 1;
            let result = build_request().timeout(timeout).send().await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS && attempt <= self.max_retries {
                        tracing::warn!(provider, attempt, "rate limited, backing off");
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                        continue;
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        return Err(LlmError::RateLimitExhausted { attempts: attempt });
                    }
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(LlmError::ProviderAuth(format!(
                            "{provider} returned {status}"
                        )));
                    }
                    let body = response.text().await.unwrap_or_default();
                    return Err(LlmError::Transport {
                        provider: provider.to_string(),
                        message: codeforge_utils::redaction::redact(&format!("{status}: {body}")),
                    });
                }
                Err(e) if e.is_timeout() && attempt <= self.max_retries => {
                    tracing::warn!(provider, attempt, "request timed out, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    continue;
                }
                Err(e) if e.is_timeout() => {
                    return Err(LlmError::Timeout {
                        timeout_s: timeout.as_secs(),
                    });
                }
                Err(e) => {
                    return Err(LlmError::Transport {
                        provider: provider.to_string(),
                        message: codeforge_utils::redaction::redact(&e.to_string()),
                    });
                }
            }
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_policy_matches_spec_defaults() {
        let client = HttpClient::new();
        assert_eq!(client.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(client.initial_backoff, DEFAULT_INITIAL_BACKOFF);
    }

    #[test]
    fn with_retry_policy_overrides_defaults() {
        let client = HttpClient::new().with_retry_policy(1, Duration::from_millis(10));
        assert_eq!(client.max_retries, 1);
        assert_eq!(client.initial_backoff, Duration::from_millis(10));
    }
}
