//! Document extraction backends.
//!
//! The external extraction tool is opaque: it takes a PDF and produces a
//! directory tree of image files plus a markdown transcript. That contract
//! is captured by the [`ExtractionBackend`] trait so the pipeline can run
//! against the real [`MineruBackend`] in production and a canned
//! [`FixtureBackend`] in tests without spawning a subprocess.

mod mineru;

pub mod mock;

pub use mineru::MineruBackend;
pub use mock::FixtureBackend;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::models::RawImageAsset;

/// Quality and behavior knobs forwarded to the extraction tool.
///
/// The values are passed through opaquely; the defaults mirror the
/// highest-quality settings the MinerU CLI accepts.
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// Page rendering DPI
    pub render_dpi: u32,
    /// Embedded image DPI
    pub image_dpi: u32,
    /// Image quality percentage (1-100)
    pub quality: u8,
    /// Preserve vector graphics instead of rasterizing them
    pub keep_vector: bool,
    /// Disable output compression
    pub no_compress: bool,
    /// Language hint for the tool's OCR stage (e.g. "en", "ch")
    pub lang: Option<String>,
    /// Hard limit on the subprocess run time
    pub timeout: Duration,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            render_dpi: 1200,
            image_dpi: 1200,
            quality: 100,
            keep_vector: true,
            no_compress: true,
            lang: Some("en".to_string()),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Everything the extraction tool produced for one PDF
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutput {
    /// Image files in stable (lexicographic) extraction order
    pub images: Vec<RawImageAsset>,
    /// Markdown transcript of the document, when the tool emitted one
    pub markdown: Option<String>,
}

/// Errors raised by an extraction backend
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The external tool binary is not installed or not on PATH
    #[error("'{tool}' not found on PATH; install it with `{remediation}` and retry")]
    ToolMissing { tool: String, remediation: String },

    /// The tool ran but exited with a failure status
    #[error("'{tool}' failed with {status} while processing {pdf}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        pdf: PathBuf,
        stderr: String,
    },

    /// The tool exceeded its time budget
    #[error("'{tool}' did not finish within {seconds}s; the subprocess was killed")]
    Timeout { tool: String, seconds: u64 },

    /// Failure reading the tool's output tree
    #[error("failed reading extraction output at {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure spawning the subprocess for a reason other than a missing binary
    #[error("failed to launch '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// A document extraction capability.
///
/// Implementations convert one PDF into image assets and an optional
/// markdown transcript under `work_dir`, without interpreting the images.
#[async_trait]
pub trait ExtractionBackend: Send + Sync + std::fmt::Debug {
    /// Short identifier for logs (e.g. "mineru")
    fn id(&self) -> &str;

    /// Extract images and text from `pdf_path`, staging output under `work_dir`.
    async fn extract(
        &self,
        pdf_path: &Path,
        work_dir: &Path,
        options: &ExtractionOptions,
    ) -> Result<ExtractionOutput, ExtractionError>;
}
