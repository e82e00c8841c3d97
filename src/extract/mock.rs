//! Fixture backend for testing purposes.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::extract::{ExtractionBackend, ExtractionError, ExtractionOptions, ExtractionOutput};

/// An extraction backend that returns predefined output.
///
/// Lets tests drive the whole pipeline without the real extraction tool:
/// set an [`ExtractionOutput`] (or an error) and every `extract` call
/// returns a clone of it.
#[derive(Debug, Default)]
pub struct FixtureBackend {
    output: Mutex<Option<ExtractionOutput>>,
    fail_missing_tool: Mutex<bool>,
}

impl FixtureBackend {
    /// Create a fixture backend with empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fixture backend that always returns `output`.
    pub fn with_output(output: ExtractionOutput) -> Self {
        let backend = Self::new();
        backend.set_output(output);
        backend
    }

    /// Set the extraction output to return.
    pub fn set_output(&self, output: ExtractionOutput) {
        let mut guard = self.output.lock().unwrap();
        *guard = Some(output);
    }

    /// Make every `extract` call fail as if the tool binary were missing.
    pub fn fail_with_missing_tool(&self) {
        let mut guard = self.fail_missing_tool.lock().unwrap();
        *guard = true;
    }
}

#[async_trait]
impl ExtractionBackend for FixtureBackend {
    fn id(&self) -> &str {
        "fixture"
    }

    async fn extract(
        &self,
        _pdf_path: &Path,
        _work_dir: &Path,
        _options: &ExtractionOptions,
    ) -> Result<ExtractionOutput, ExtractionError> {
        if *self.fail_missing_tool.lock().unwrap() {
            return Err(ExtractionError::ToolMissing {
                tool: "mineru".to_string(),
                remediation: "pip install \"mineru[core]\"".to_string(),
            });
        }

        let guard = self.output.lock().unwrap();
        Ok(guard.clone().unwrap_or_default())
    }
}
