//! Shared HTTP plumbing for providers and the image fetcher.

use std::time::Duration;

use portrait_qa_core::domain::ExternalServiceError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("portrait-qa/", env!("CARGO_PKG_VERSION"));

/// Connection settings for one HTTP collaborator.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures.
    pub retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff: Duration,
    /// API key, sent the way each adapter's service expects.
    pub api_key: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 2,
            backoff: Duration::from_millis(250),
            api_key: None,
        }
    }
}

impl HttpSettings {
    /// Builds a client honouring these settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the TLS backend cannot be initialised.
    pub fn client(&self, service: &str) -> Result<Client, ExternalServiceError> {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ExternalServiceError::Unreachable {
                service: service.to_string(),
                reason: e.to_string(),
            })
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1 << attempt.min(6))
    }

    /// Longest a call can take when every attempt runs to its timeout.
    ///
    /// Outer bounds on a provider call should be at least this long, or the
    /// retries never get a chance to run.
    #[must_use]
    pub fn call_budget(&self) -> Duration {
        let attempts = self.timeout.saturating_mul(self.retries.saturating_add(1));
        (0..self.retries)
            .map(|attempt| self.delay(attempt))
            .fold(attempts, Duration::saturating_add)
    }
}

/// Sends a request, retrying transport failures and 429/5xx answers.
///
/// `build` is called once per attempt.
pub(crate) async fn send_with_retries(
    service: &str,
    settings: &HttpSettings,
    build: impl Fn() -> RequestBuilder,
) -> Result<Response, ExternalServiceError> {
    let mut attempt = 0;
    loop {
        let last = attempt >= settings.retries;
        match build().send().await {
            Ok(response) if response.status().is_success() => {
                debug!(service, attempt, "request succeeded");
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status();
                if last || !is_retryable_status(status) {
                    return Err(ExternalServiceError::Status {
                        service: service.to_string(),
                        status: status.as_u16(),
                    });
                }
                warn!(service, attempt, %status, "transient status, retrying");
            }
            Err(err) => {
                if last || !is_retryable(&err) {
                    return Err(transport_error(service, settings, &err));
                }
                warn!(service, attempt, error = %err, "transport failure, retrying");
            }
        }
        tokio::time::sleep(settings.delay(attempt)).await;
        attempt += 1;
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

pub(crate) fn transport_error(
    service: &str,
    settings: &HttpSettings,
    err: &reqwest::Error,
) -> ExternalServiceError {
    if err.is_timeout() {
        ExternalServiceError::Timeout {
            service: service.to_string(),
            timeout: settings.timeout,
        }
    } else {
        ExternalServiceError::Unreachable {
            service: service.to_string(),
            reason: err.to_string(),
        }
    }
}

pub(crate) fn malformed(service: &str, reason: impl ToString) -> ExternalServiceError {
    ExternalServiceError::Malformed {
        service: service.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let settings = HttpSettings {
            backoff: Duration::from_millis(100),
            ..HttpSettings::default()
        };
        assert_eq!(settings.delay(0), Duration::from_millis(100));
        assert_eq!(settings.delay(1), Duration::from_millis(200));
        assert_eq!(settings.delay(3), Duration::from_millis(800));
        assert_eq!(settings.delay(40), Duration::from_millis(6400));
    }

    #[test]
    fn test_call_budget_covers_every_attempt_and_backoff() {
        let settings = HttpSettings::default();
        assert_eq!(settings.call_budget(), Duration::from_millis(30_750));

        let single = HttpSettings {
            retries: 0,
            ..HttpSettings::default()
        };
        assert_eq!(single.call_budget(), single.timeout);
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
    }
}
