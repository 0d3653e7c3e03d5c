//! Retrying request executor.

use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for every attempt after that.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    pub fn is_retryable(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.base_delay_ms))
    }
}

/// Sends requests through a shared connection pool, retrying transient
/// failures according to a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    http_client: Client,
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(http_client: Client, policy: RetryPolicy) -> Self {
        Self {
            http_client,
            policy,
        }
    }

    pub fn client(&self) -> &Client {
        &self.http_client
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Perform one logical request.
    ///
    /// Returns the response untouched on a 2xx status. Connection failures
    /// and statuses in the retryable set are retried; any other status fails
    /// at once with [`Error::RequestFailure`].
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response> {
        let mut attempt = 1;

        loop {
            let outcome = self
                .http_client
                .request(method.clone(), url)
                .query(query)
                .send()
                .await;

            let (status, detail) = match outcome {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    // Reading the body releases the connection back to the pool.
                    let body = response.text().await.unwrap_or_default();
                    if !RetryPolicy::is_retryable(status) {
                        tracing::error!("GitHub API error: {} - {}", status, body);
                        return Err(Error::RequestFailure {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    (Some(status.as_u16()), body)
                }
                Err(e) if e.is_builder() => {
                    return Err(Error::InvalidParams(format!("Invalid request to {}: {}", url, e)));
                }
                Err(e) => (None, e.to_string()),
            };

            if attempt >= self.policy.max_attempts {
                tracing::error!(
                    attempts = attempt,
                    status = ?status,
                    "GitHub request to {} failed: {}",
                    url,
                    detail
                );
                return Err(Error::TransientRequestFailure {
                    attempts: attempt,
                    status,
                    detail,
                });
            }

            let delay = self.policy.backoff(attempt);
            tracing::warn!(
                attempt,
                backoff_ms = delay.as_millis() as u64,
                status = ?status,
                "Transient failure from {}, retrying",
                url
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.backoff(40), Duration::from_secs(u32::MAX as u64));
    }

    #[rstest]
    #[case(429, true)]
    #[case(500, true)]
    #[case(502, true)]
    #[case(503, true)]
    #[case(504, true)]
    #[case(400, false)]
    #[case(401, false)]
    #[case(403, false)]
    #[case(404, false)]
    #[case(422, false)]
    #[case(501, false)]
    fn test_retryable_statuses(#[case] code: u16, #[case] retryable: bool) {
        let status = StatusCode::from_u16(code).unwrap();
        assert_eq!(RetryPolicy::is_retryable(status), retryable);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 0,
            base_delay_ms: 250,
        });
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
    }
}
