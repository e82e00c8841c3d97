//! Retry utilities with exponential backoff for resilient downloads.

use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::fetch::DownloadError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum total time to spend on retries (including delays)
    pub max_total_time: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            max_total_time: Duration::from_secs(300),
        }
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Network connectivity issues
    Network,
    /// Server error (5xx)
    ServerError,
    /// Service unavailable (503)
    ServiceUnavailable,
    /// Gateway timeout (504)
    GatewayTimeout,
    /// Too many requests (429)
    TooManyRequests,
    /// Request timeout
    Timeout,
    /// Zero-byte or truncated response body
    Truncated,
}

impl TransientError {
    /// Check if a download error represents a transient failure
    pub fn from_download_error(err: &DownloadError) -> Option<Self> {
        match err {
            DownloadError::Network { .. } => Some(TransientError::Network),
            DownloadError::Timeout { .. } => Some(TransientError::Timeout),
            DownloadError::Corrupt { .. } => Some(TransientError::Truncated),
            DownloadError::Http { status, .. } => match *status {
                429 => Some(TransientError::TooManyRequests),
                503 => Some(TransientError::ServiceUnavailable),
                504 => Some(TransientError::GatewayTimeout),
                s if (500..600).contains(&s) => Some(TransientError::ServerError),
                _ => None,
            },
            DownloadError::Io { .. } => None,
        }
    }

    /// Get the recommended delay for this error
    pub fn recommended_delay(&self) -> Duration {
        match self {
            TransientError::TooManyRequests => Duration::from_secs(30),
            TransientError::ServiceUnavailable => Duration::from_secs(10),
            TransientError::GatewayTimeout => Duration::from_secs(5),
            TransientError::Timeout => Duration::from_secs(2),
            TransientError::Network => Duration::from_secs(2),
            TransientError::ServerError => Duration::from_secs(2),
            TransientError::Truncated => Duration::from_secs(1),
        }
    }
}

/// Execute an async operation with retry logic
///
/// Transient failures are retried with exponential backoff until the
/// attempt or total-time budget is exhausted; permanent failures return
/// immediately with the underlying error.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation: F) -> Result<T, DownloadError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, DownloadError>>,
{
    let mut attempts = 0;
    let mut total_elapsed = Duration::ZERO;
    let mut operation = operation;

    loop {
        attempts += 1;

        match timeout(config.max_total_time, operation()).await {
            Ok(Ok(result)) => {
                if attempts > 1 {
                    tracing::info!(
                        "download succeeded on attempt {} after {} transient failures",
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Ok(Err(error)) => {
                let Some(transient) = TransientError::from_download_error(&error) else {
                    return Err(error);
                };

                let delay = if attempts == 1 {
                    config.initial_delay
                } else {
                    let exp_delay = config.initial_delay.as_secs_f64()
                        * config.backoff_multiplier.powf(attempts as f64 - 1.0);
                    Duration::from_secs_f64(exp_delay.min(config.max_delay.as_secs_f64()))
                };
                let delay = std::cmp::max(delay, transient.recommended_delay());

                total_elapsed += delay;

                if attempts >= config.max_attempts || total_elapsed >= config.max_total_time {
                    tracing::warn!(
                        "download failed after {} attempts (total elapsed: {:?}): {}",
                        attempts,
                        total_elapsed,
                        error
                    );
                    return Err(error);
                }

                tracing::debug!(
                    "transient error on attempt {}: {:?}, retrying in {:?}",
                    attempts,
                    transient,
                    delay
                );

                sleep(delay).await;
            }
            Err(_) => {
                // Timeout of the entire operation
                let error = DownloadError::Timeout {
                    url: String::new(),
                    seconds: config.max_total_time.as_secs(),
                };
                if attempts >= config.max_attempts {
                    return Err(error);
                }

                let delay = config.initial_delay;
                total_elapsed += delay;

                tracing::debug!(
                    "operation timed out, attempt {}/{}",
                    attempts,
                    config.max_attempts
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 4,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_total_time: Duration::from_secs(30),
        }
    }

    fn transient_err() -> DownloadError {
        DownloadError::Corrupt {
            url: "http://example.com/a.pdf".to_string(),
            reason: "zero-byte response".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let call_count = Rc::new(RefCell::new(0));

        let result = {
            let call_count = call_count.clone();
            with_retry(fast_config(), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Ok("success")
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(*call_count.borrow(), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_transient_failures() {
        let call_count = Rc::new(RefCell::new(0));

        let result = {
            let call_count = call_count.clone();
            with_retry(fast_config(), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    let count = *call_count.borrow();
                    if count < 3 {
                        Err(transient_err())
                    } else {
                        Ok("success")
                    }
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(*call_count.borrow(), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_permanent_error_immediately() {
        let call_count = Rc::new(RefCell::new(0));

        let result: Result<&str, DownloadError> = {
            let call_count = call_count.clone();
            with_retry(fast_config(), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Err(DownloadError::Http {
                        status: 404,
                        url: "http://example.com/a.pdf".to_string(),
                    })
                }
            })
        }
        .await;

        assert!(matches!(
            result,
            Err(DownloadError::Http { status: 404, .. })
        ));
        assert_eq!(*call_count.borrow(), 1);
    }

    #[test]
    fn test_transient_error_detection() {
        assert_eq!(
            TransientError::from_download_error(&transient_err()),
            Some(TransientError::Truncated)
        );
        assert_eq!(
            TransientError::from_download_error(&DownloadError::Http {
                status: 503,
                url: String::new()
            }),
            Some(TransientError::ServiceUnavailable)
        );
        assert_eq!(
            TransientError::from_download_error(&DownloadError::Http {
                status: 500,
                url: String::new()
            }),
            Some(TransientError::ServerError)
        );
        // Client errors are permanent
        assert_eq!(
            TransientError::from_download_error(&DownloadError::Http {
                status: 403,
                url: String::new()
            }),
            None
        );
    }
}
