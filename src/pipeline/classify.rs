//! Content classifier: separates paper figures from decorative page furniture.

use regex::Regex;

use crate::models::{ClassifiedImage, ClassifyReason, RawImageAsset};

/// Exclusive lower bound on content image size; anything smaller is
/// rejected without looking at the file name.
pub const MIN_CONTENT_BYTES: u64 = 5 * 1024;

/// Filename signatures of decorative output emitted by extraction tools.
///
/// The rule set is deliberately data-driven: extraction tools change their
/// naming conventions between releases, so deployments can extend this
/// list through configuration instead of a code change.
pub const DEFAULT_DECORATIVE_PATTERNS: &[&str] = &[
    r"(?i)header",
    r"(?i)footer",
    r"(?i)logo",
    r"(?i)watermark",
    r"(?i)banner",
    r"(?i)^page[-_]?\d+[-_]?(deco|rule|line)",
];

/// A single filename rejection rule
#[derive(Debug, Clone)]
struct DecorativeRule {
    pattern: Regex,
}

/// Classifies extracted images as content (keep) or noise (drop).
#[derive(Debug, Clone)]
pub struct Classifier {
    min_bytes: u64,
    rules: Vec<DecorativeRule>,
}

impl Classifier {
    /// Build a classifier from a size threshold and decorative patterns.
    ///
    /// Invalid patterns are skipped with a warning rather than failing the
    /// run; the built-in defaults are always valid.
    pub fn new<S: AsRef<str>>(min_bytes: u64, patterns: &[S]) -> Self {
        let rules = patterns
            .iter()
            .filter_map(|p| match Regex::new(p.as_ref()) {
                Ok(pattern) => Some(DecorativeRule { pattern }),
                Err(e) => {
                    tracing::warn!("skipping invalid decorative pattern '{}': {}", p.as_ref(), e);
                    None
                }
            })
            .collect();

        Self { min_bytes, rules }
    }

    /// Decide whether `asset` is paper content.
    ///
    /// Pure function; check order matters: the cheap size test short-circuits
    /// before any pattern matching runs.
    pub fn classify(&self, asset: &RawImageAsset) -> ClassifiedImage {
        if asset.byte_size < self.min_bytes {
            return ClassifiedImage {
                asset: asset.clone(),
                keep: false,
                reason: ClassifyReason::TooSmall,
            };
        }

        let name = asset.file_name();
        if self.rules.iter().any(|rule| rule.pattern.is_match(name)) {
            return ClassifiedImage {
                asset: asset.clone(),
                keep: false,
                reason: ClassifyReason::DecorativePattern,
            };
        }

        ClassifiedImage {
            asset: asset.clone(),
            keep: true,
            reason: ClassifyReason::Content,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(MIN_CONTENT_BYTES, DEFAULT_DECORATIVE_PATTERNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageKind;
    use std::path::PathBuf;

    fn asset(name: &str, byte_size: u64) -> RawImageAsset {
        RawImageAsset {
            path: PathBuf::from(name),
            byte_size,
            width: 800,
            height: 600,
            kind: ImageKind::Png,
        }
    }

    #[test]
    fn test_small_images_always_rejected_regardless_of_name() {
        let classifier = Classifier::default();
        for name in ["figure_1.png", "header.png", "anything.jpg"] {
            let result = classifier.classify(&asset(name, MIN_CONTENT_BYTES - 1));
            assert!(!result.keep);
            assert_eq!(result.reason, ClassifyReason::TooSmall);
        }
    }

    #[test]
    fn test_threshold_is_exclusive_lower_bound() {
        let classifier = Classifier::default();
        let result = classifier.classify(&asset("figure_1.png", MIN_CONTENT_BYTES));
        assert!(result.keep);
        assert_eq!(result.reason, ClassifyReason::Content);
    }

    #[test]
    fn test_decorative_names_rejected() {
        let classifier = Classifier::default();
        for name in [
            "page_header.png",
            "Footer_2.png",
            "journal_logo.jpg",
            "watermark.png",
        ] {
            let result = classifier.classify(&asset(name, 50_000));
            assert!(!result.keep, "{} should be decorative", name);
            assert_eq!(result.reason, ClassifyReason::DecorativePattern);
        }
    }

    #[test]
    fn test_content_images_kept() {
        let classifier = Classifier::default();
        for name in ["figure_3.png", "equation_12.jpg", "diagram.svg"] {
            let result = classifier.classify(&asset(name, 50_000));
            assert!(result.keep, "{} should be content", name);
            assert_eq!(result.reason, ClassifyReason::Content);
        }
    }

    #[test]
    fn test_size_check_wins_over_pattern_check() {
        let classifier = Classifier::default();
        let result = classifier.classify(&asset("header.png", 100));
        assert_eq!(result.reason, ClassifyReason::TooSmall);
    }

    #[test]
    fn test_custom_patterns_extend_rule_set() {
        let classifier = Classifier::new(MIN_CONTENT_BYTES, &["(?i)ornament"]);
        let result = classifier.classify(&asset("ornament_3.png", 50_000));
        assert!(!result.keep);
        // Built-in header pattern is not part of this rule set
        let result = classifier.classify(&asset("header.png", 50_000));
        assert!(result.keep);
    }

    #[test]
    fn test_invalid_pattern_skipped_not_fatal() {
        let classifier = Classifier::new(MIN_CONTENT_BYTES, &["([unclosed"]);
        let result = classifier.classify(&asset("figure.png", 50_000));
        assert!(result.keep);
    }
}
