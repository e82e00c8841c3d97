//! # figmine
//!
//! Download arXiv papers and harvest publication-quality figures via the
//! MinerU extraction CLI.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (PaperReference, image assets, etc.)
//! - [`fetch`]: PDF downloader with retry and corruption detection
//! - [`extract`]: Extraction backends behind the [`extract::ExtractionBackend`] trait
//! - [`pipeline`]: Classification, enhancement, title resolution and the
//!   bundle organizer, orchestrated by [`pipeline::Pipeline`]
//! - [`utils`]: HTTP client, retry/backoff, progress reporting
//! - [`config`]: Configuration management

pub mod config;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use models::PaperReference;
pub use pipeline::{Pipeline, RunReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
