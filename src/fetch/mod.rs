//! PDF fetcher: streams a remote file to disk with retry and corruption checks.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::utils::{with_retry, HttpClient, RetryConfig, REQUEST_TIMEOUT_SECS};

/// Errors raised while downloading a PDF
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Connection-level failure (DNS, refused, reset)
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// Non-success HTTP status
    #[error("server returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    /// Zero-byte or truncated response body
    #[error("download of {url} looks corrupt: {reason}")]
    Corrupt { url: String, reason: String },

    /// The request exceeded its time budget
    #[error("request for {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    /// Local filesystem failure while writing the file
    #[error("failed writing download to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Downloads remote resources to local paths.
///
/// Transient failures (connectivity, 5xx, truncated bodies) are retried
/// with exponential backoff per the configured [`RetryConfig`]; permanent
/// failures (4xx, local IO) surface immediately.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: HttpClient,
    retry: RetryConfig,
}

impl Fetcher {
    pub fn new(client: HttpClient, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Fetch `url` into `dest`, returning the destination path.
    ///
    /// The file is rewritten from scratch on every attempt, so a partial
    /// body from a failed attempt never survives into the result.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf, DownloadError> {
        with_retry(self.retry, || self.fetch_once(url, dest)).await?;
        Ok(dest.to_path_buf())
    }

    async fn fetch_once(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let response = self
            .client
            .client()
            .get(url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let expected_len = response.content_length();

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| DownloadError::Io {
                path: dest.to_path_buf(),
                source: e,
            })?;

        let mut written: u64 = 0;
        let mut response = response;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => return Err(classify_reqwest_error(url, &e)),
            };
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::Io {
                    path: dest.to_path_buf(),
                    source: e,
                })?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| DownloadError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;

        if written == 0 {
            return Err(DownloadError::Corrupt {
                url: url.to_string(),
                reason: "zero-byte response".to_string(),
            });
        }

        if let Some(expected) = expected_len {
            if written != expected {
                return Err(DownloadError::Corrupt {
                    url: url.to_string(),
                    reason: format!("truncated response: got {} of {} bytes", written, expected),
                });
            }
        }

        tracing::debug!("downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}

fn classify_reqwest_error(url: &str, err: &reqwest::Error) -> DownloadError {
    if err.is_timeout() {
        DownloadError::Timeout {
            url: url.to_string(),
            seconds: REQUEST_TIMEOUT_SECS,
        }
    } else {
        DownloadError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
