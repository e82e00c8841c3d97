//! The paper-processing pipeline.
//!
//! Stages run strictly in sequence: fetch, extract, classify, enhance,
//! resolve title, organize. Per-image enhancement fans out over blocking
//! workers but results are collected back in extraction order, so the
//! final bundle is independent of worker scheduling.

mod classify;
mod enhance;
mod organize;
mod title;

pub use classify::{Classifier, DEFAULT_DECORATIVE_PATTERNS, MIN_CONTENT_BYTES};
pub use enhance::{EnhanceSettings, Enhancer, ImageError};
pub use organize::{organize, sanitize_title, OrganizeError, OutputBundle};
pub use title::{resolve_title, TitleCandidate, TitleSource};

use std::path::Path;
use std::sync::Arc;

use futures_util::{stream, StreamExt};
use thiserror::Error;

use crate::config::Config;
use crate::extract::{ExtractionBackend, ExtractionError};
use crate::fetch::{DownloadError, Fetcher};
use crate::models::{ClassifiedImage, ClassifyReason, EnhancedImage, PaperReference, ReferenceError};
use crate::utils::{HttpClient, ProgressReporter};

/// Errors that abort processing of one paper
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidReference(#[from] ReferenceError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Organize(#[from] OrganizeError),

    #[error("scratch directory setup failed: {0}")]
    Scratch(#[from] std::io::Error),
}

/// Summary of one successful pipeline run
#[derive(Debug)]
pub struct RunReport {
    pub reference: PaperReference,
    pub bundle: OutputBundle,
    /// Images surfaced by the extraction backend
    pub extracted: usize,
    /// Images that passed classification
    pub kept: usize,
    pub dropped_too_small: usize,
    pub dropped_decorative: usize,
    /// Kept images that bypassed enhancement (vector or fallback copy)
    pub copied_through: usize,
}

/// Orchestrates the full fetch-extract-enhance-organize flow for papers.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
    fetcher: Fetcher,
    backend: Arc<dyn ExtractionBackend>,
}

impl Pipeline {
    pub fn new(config: Config, backend: Arc<dyn ExtractionBackend>) -> Self {
        let fetcher = Fetcher::new(HttpClient::new(), config.retry_config());
        Self {
            config,
            fetcher,
            backend,
        }
    }

    /// Process one paper given a URL or bare identifier.
    pub async fn process(&self, input: &str) -> Result<RunReport, PipelineError> {
        let reference = PaperReference::parse(input)?;
        self.process_reference(&reference).await
    }

    /// Process one paper from an already-parsed reference.
    pub async fn process_reference(
        &self,
        reference: &PaperReference,
    ) -> Result<RunReport, PipelineError> {
        tracing::info!("processing {} from {}", reference.id, reference.pdf_url);

        // One scratch dir per paper holds the PDF, the extraction tool's
        // output and the enhanced staging area; removed on every exit path
        // unless keep_temp asks otherwise.
        let scratch = tempfile::Builder::new().prefix("figmine-").tempdir()?;

        let result = self.run_stages(reference, scratch.path()).await;

        if self.config.keep_temp {
            let retained = scratch.into_path();
            tracing::info!("scratch directory retained at {}", retained.display());
        }

        result
    }

    async fn run_stages(
        &self,
        reference: &PaperReference,
        scratch: &Path,
    ) -> Result<RunReport, PipelineError> {
        let safe_id = sanitize_title(&reference.id, "paper");
        let pdf_path = scratch.join(format!("{}.pdf", safe_id));
        self.fetcher.fetch(&reference.pdf_url, &pdf_path).await?;
        tracing::info!("downloaded PDF to {}", pdf_path.display());

        let options = self.config.extraction_options();
        let extraction = self.backend.extract(&pdf_path, scratch, &options).await?;
        let extracted = extraction.images.len();

        let classifier = self.config.build_classifier();
        let classified: Vec<ClassifiedImage> = extraction
            .images
            .iter()
            .map(|asset| classifier.classify(asset))
            .collect();

        let dropped_too_small = count_reason(&classified, ClassifyReason::TooSmall);
        let dropped_decorative = count_reason(&classified, ClassifyReason::DecorativePattern);
        for dropped in classified.iter().filter(|c| !c.keep) {
            tracing::debug!("dropping {} ({:?})", dropped.asset.file_name(), dropped.reason);
        }

        let kept: Vec<ClassifiedImage> = classified.into_iter().filter(|c| c.keep).collect();
        let kept_count = kept.len();
        tracing::info!(
            "classification kept {}/{} images ({} too small, {} decorative)",
            kept_count,
            extracted,
            dropped_too_small,
            dropped_decorative
        );

        let enhanced_dir = scratch.join("enhanced");
        std::fs::create_dir_all(&enhanced_dir)?;

        let enhancer = Enhancer::new(self.config.enhance_settings());
        let enhanced = enhance_all(
            enhancer,
            kept,
            &enhanced_dir,
            self.config.enhance.workers,
        )
        .await;

        let copied_through = enhanced
            .iter()
            .filter(|e| e.source_path.file_name() == e.output_path.file_name())
            .count();

        let paper_title = resolve_title(extraction.markdown.as_deref(), &reference.id);
        tracing::info!("resolved title: {}", paper_title);

        let bundle = organize(
            &self.config.output_dir,
            &paper_title,
            &reference.id,
            &pdf_path,
            &enhanced,
        )?;

        Ok(RunReport {
            reference: reference.clone(),
            bundle,
            extracted,
            kept: kept_count,
            dropped_too_small,
            dropped_decorative,
            copied_through,
        })
    }
}

fn count_reason(classified: &[ClassifiedImage], reason: ClassifyReason) -> usize {
    classified.iter().filter(|c| c.reason == reason).count()
}

/// Enhance kept images across blocking workers, preserving input order.
///
/// Per-image failures are logged and isolated; a failed image is simply
/// absent from the result, the batch never aborts.
async fn enhance_all(
    enhancer: Enhancer,
    kept: Vec<ClassifiedImage>,
    out_dir: &Path,
    workers: usize,
) -> Vec<EnhancedImage> {
    let progress = ProgressReporter::new("Enhancing images", kept.len());

    let results: Vec<Option<EnhancedImage>> = stream::iter(kept)
        .map(|image| {
            let out_dir = out_dir.to_path_buf();
            let progress = progress.clone();
            async move {
                let outcome =
                    tokio::task::spawn_blocking(move || enhancer.enhance(&image, &out_dir)).await;
                progress.inc();
                match outcome {
                    Ok(Ok(enhanced)) => Some(enhanced),
                    Ok(Err(e)) => {
                        tracing::error!("dropping image after unrecoverable failure: {}", e);
                        None
                    }
                    Err(e) => {
                        tracing::error!("enhancement worker panicked: {}", e);
                        None
                    }
                }
            }
        })
        // buffered() polls up to `workers` futures concurrently but yields
        // results in input order
        .buffered(workers.max(1))
        .collect()
        .await;

    progress.finish();
    results.into_iter().flatten().collect()
}
