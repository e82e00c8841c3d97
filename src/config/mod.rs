//! Configuration management.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extract::ExtractionOptions;
use crate::pipeline::{Classifier, EnhanceSettings};
use crate::utils::RetryConfig;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory that receives one bundle per paper
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Retain the scratch directory after a run instead of deleting it
    #[serde(default)]
    pub keep_temp: bool,

    /// Download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Extraction tool settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Content-vs-decorative classification settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Enhancement chain settings
    #[serde(default)]
    pub enhance: EnhanceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            keep_temp: false,
            download: DownloadConfig::default(),
            extraction: ExtractionConfig::default(),
            classifier: ClassifierConfig::default(),
            enhance: EnhanceConfig::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Maximum download attempts per paper
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds before the first retry; later retries back off exponentially
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,

    /// Total seconds allowed for one download including retries
    #[serde(default = "default_download_budget_secs")]
    pub total_budget_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_secs: default_initial_delay_secs(),
            total_budget_secs: default_download_budget_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_secs() -> u64 {
    1
}

fn default_download_budget_secs() -> u64 {
    300
}

/// Extraction tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Page rendering DPI passed to the tool
    #[serde(default = "default_dpi")]
    pub render_dpi: u32,

    /// Embedded image DPI passed to the tool
    #[serde(default = "default_dpi")]
    pub image_dpi: u32,

    /// Image quality percentage (1-100)
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Preserve vector graphics instead of rasterizing
    #[serde(default = "default_true")]
    pub keep_vector: bool,

    /// Disable output compression
    #[serde(default = "default_true")]
    pub no_compress: bool,

    /// Language hint for the tool's OCR stage
    #[serde(default = "default_lang")]
    pub lang: Option<String>,

    /// Seconds the subprocess may run before being killed
    #[serde(default = "default_extraction_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            render_dpi: default_dpi(),
            image_dpi: default_dpi(),
            quality: default_quality(),
            keep_vector: true,
            no_compress: true,
            lang: default_lang(),
            timeout_secs: default_extraction_timeout_secs(),
        }
    }
}

fn default_dpi() -> u32 {
    1200
}

fn default_quality() -> u8 {
    100
}

fn default_true() -> bool {
    true
}

fn default_lang() -> Option<String> {
    Some("en".to_string())
}

fn default_extraction_timeout_secs() -> u64 {
    600
}

/// Classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Exclusive lower bound on content image size in bytes
    #[serde(default = "default_min_bytes")]
    pub min_bytes: u64,

    /// Extra decorative filename patterns merged after the built-in set
    #[serde(default)]
    pub decorative_patterns: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_bytes: default_min_bytes(),
            decorative_patterns: Vec::new(),
        }
    }
}

fn default_min_bytes() -> u64 {
    crate::pipeline::MIN_CONTENT_BYTES
}

/// Enhancement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceConfig {
    /// Images with either dimension below this are upscaled 2x
    #[serde(default = "default_small_dimension")]
    pub small_dimension: u32,

    /// Sharpen intensity
    #[serde(default = "default_sharpness")]
    pub sharpness: f32,

    /// Contrast scale
    #[serde(default = "default_contrast")]
    pub contrast: f32,

    /// Saturation scale
    #[serde(default = "default_saturation")]
    pub saturation: f32,

    /// Concurrent enhancement workers
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            small_dimension: default_small_dimension(),
            sharpness: default_sharpness(),
            contrast: default_contrast(),
            saturation: default_saturation(),
            workers: default_workers(),
        }
    }
}

fn default_small_dimension() -> u32 {
    1000
}

fn default_sharpness() -> f32 {
    1.3
}

fn default_contrast() -> f32 {
    1.15
}

fn default_saturation() -> f32 {
    1.05
}

fn default_workers() -> usize {
    4
}

impl Config {
    /// Retry settings for the fetcher.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.download.max_attempts,
            initial_delay: Duration::from_secs(self.download.initial_delay_secs),
            max_total_time: Duration::from_secs(self.download.total_budget_secs),
            ..RetryConfig::default()
        }
    }

    /// Options handed to the extraction backend.
    pub fn extraction_options(&self) -> ExtractionOptions {
        ExtractionOptions {
            render_dpi: self.extraction.render_dpi,
            image_dpi: self.extraction.image_dpi,
            quality: self.extraction.quality,
            keep_vector: self.extraction.keep_vector,
            no_compress: self.extraction.no_compress,
            lang: self.extraction.lang.clone(),
            timeout: Duration::from_secs(self.extraction.timeout_secs),
        }
    }

    /// Build the classifier: built-in decorative rules plus configured extras.
    pub fn build_classifier(&self) -> Classifier {
        let mut patterns: Vec<String> = crate::pipeline::DEFAULT_DECORATIVE_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .collect();
        patterns.extend(self.classifier.decorative_patterns.iter().cloned());
        Classifier::new(self.classifier.min_bytes, &patterns)
    }

    /// Tuning for the enhancement chain.
    pub fn enhance_settings(&self) -> EnhanceSettings {
        EnhanceSettings {
            small_dimension: self.enhance.small_dimension,
            sharpness: self.enhance.sharpness,
            contrast: self.enhance.contrast,
            saturation: self.enhance.saturation,
        }
    }
}

/// Load configuration from a file, with `FIGMINE_*` environment overrides
pub fn load_config(path: &PathBuf) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_path()))
        .add_source(config::Environment::with_prefix("FIGMINE").separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Probe the default config file locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("./figmine.toml");
    if local.is_file() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("figmine").join("config.toml");
    user.is_file().then_some(user)
}
