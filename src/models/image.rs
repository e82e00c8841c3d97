//! Image asset models shared across the classification and enhancement stages.

use std::path::{Path, PathBuf};

/// Raster/vector format of an extracted asset, judged by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Svg,
    Other,
}

impl ImageKind {
    /// Determine the kind from a file path extension.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => ImageKind::Png,
            Some("jpg") | Some("jpeg") => ImageKind::Jpeg,
            Some("svg") => ImageKind::Svg,
            _ => ImageKind::Other,
        }
    }

    /// Whether this is a vector format that bypasses raster processing.
    pub fn is_vector(&self) -> bool {
        matches!(self, ImageKind::Svg)
    }
}

/// An image file surfaced by the extraction backend.
///
/// Read-only to downstream stages; the classifier and enhancer derive
/// their own types from it and never mutate the source file.
#[derive(Debug, Clone)]
pub struct RawImageAsset {
    pub path: PathBuf,
    pub byte_size: u64,
    /// Pixel width, 0 when unknown (vector or undecodable header)
    pub width: u32,
    /// Pixel height, 0 when unknown
    pub height: u32,
    pub kind: ImageKind,
}

impl RawImageAsset {
    /// File name portion of the asset path.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Why an asset was kept or dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyReason {
    /// Below the minimum content size
    TooSmall,
    /// File name matched a decorative-pattern rule
    DecorativePattern,
    /// Judged to be paper content
    Content,
}

/// A classified asset: the raw asset plus the keep/drop verdict
#[derive(Debug, Clone)]
pub struct ClassifiedImage {
    pub asset: RawImageAsset,
    pub keep: bool,
    pub reason: ClassifyReason,
}

/// The result of running the enhancement chain over one kept image
#[derive(Debug, Clone)]
pub struct EnhancedImage {
    /// Path of the extracted source asset
    pub source_path: PathBuf,
    /// Path of the enhanced (or fallback-copied) output file
    pub output_path: PathBuf,
    pub final_width: u32,
    pub final_height: u32,
    /// Whether the conditional 2x upscale stage ran
    pub upscaled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(ImageKind::from_path(Path::new("fig1.png")), ImageKind::Png);
        assert_eq!(ImageKind::from_path(Path::new("Fig2.JPG")), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_path(Path::new("a/b/plot.jpeg")), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_path(Path::new("diagram.svg")), ImageKind::Svg);
        assert_eq!(ImageKind::from_path(Path::new("anim.gif")), ImageKind::Other);
        assert_eq!(ImageKind::from_path(Path::new("noext")), ImageKind::Other);
    }

    #[test]
    fn test_vector_bypass() {
        assert!(ImageKind::Svg.is_vector());
        assert!(!ImageKind::Png.is_vector());
    }
}
