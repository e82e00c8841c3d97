//! Utility modules supporting the pipeline:
//!
//! - [`HttpClient`]: shared HTTP client with sensible timeouts
//! - [`RetryConfig`] / [`with_retry`]: exponential-backoff retry for
//!   transient download failures
//! - [`ProgressReporter`]: thread-safe progress counter for batch stages

mod http;
mod progress;
mod retry;

pub use http::{HttpClient, REQUEST_TIMEOUT_SECS};
pub use progress::ProgressReporter;
pub use retry::{with_retry, RetryConfig, TransientError};
