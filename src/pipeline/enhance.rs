//! Enhancement engine: a deterministic filter chain over kept images.
//!
//! Stage order is fixed: conditional upscale, sharpen, contrast,
//! saturation, denoise, lossless encode. Every stage is pure pixel math
//! over the previous stage's output, so running the chain twice on the
//! same input produces byte-identical files.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use thiserror::Error;

use crate::models::{ClassifiedImage, EnhancedImage};

/// 3x3 smoothing kernel (center-weighted, sum 13). Mild enough to knock
/// down compression noise without washing out line-art edges.
const SMOOTH_KERNEL: [f32; 9] = [
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    5.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
];

/// Tuning for the enhancement chain
#[derive(Debug, Clone, Copy)]
pub struct EnhanceSettings {
    /// Images with either dimension below this are upscaled 2x
    pub small_dimension: u32,
    /// Sharpen intensity (1.0 = unchanged)
    pub sharpness: f32,
    /// Contrast scale (1.0 = unchanged)
    pub contrast: f32,
    /// Saturation scale (1.0 = unchanged)
    pub saturation: f32,
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            small_dimension: 1000,
            sharpness: 1.3,
            contrast: 1.15,
            saturation: 1.05,
        }
    }
}

/// Errors raised while enhancing a single image
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to copy {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Applies the enhancement chain to kept images.
#[derive(Debug, Clone, Copy, Default)]
pub struct Enhancer {
    settings: EnhanceSettings,
}

impl Enhancer {
    pub fn new(settings: EnhanceSettings) -> Self {
        Self { settings }
    }

    /// Run the chain on one kept image, writing the result into `out_dir`.
    ///
    /// The source file is never modified. Vector assets pass through as
    /// verbatim copies. A decode/encode failure is recovered by copying
    /// the original file through unmodified (`upscaled = false`); only a
    /// failure of that last-resort copy is returned as an error.
    pub fn enhance(
        &self,
        classified: &ClassifiedImage,
        out_dir: &Path,
    ) -> Result<EnhancedImage, ImageError> {
        let asset = &classified.asset;

        if asset.kind.is_vector() {
            return self.copy_through(&asset.path, out_dir, asset.width, asset.height);
        }

        let stem = asset
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        let output_path = out_dir.join(format!("{}_enhanced.png", stem));

        match self.run_chain(&asset.path, &output_path) {
            Ok((width, height, upscaled)) => {
                tracing::debug!(
                    "enhanced {} ({}x{} -> {}x{})",
                    asset.file_name(),
                    asset.width,
                    asset.height,
                    width,
                    height
                );
                Ok(EnhancedImage {
                    source_path: asset.path.clone(),
                    output_path,
                    final_width: width,
                    final_height: height,
                    upscaled,
                })
            }
            Err(e) => {
                tracing::warn!(
                    "enhancement failed for {}, copying original through: {}",
                    asset.file_name(),
                    e
                );
                self.copy_through(&asset.path, out_dir, asset.width, asset.height)
            }
        }
    }

    /// The full transform chain: upscale, sharpen, contrast, saturation,
    /// denoise, encode as PNG.
    fn run_chain(&self, src: &Path, dst: &Path) -> Result<(u32, u32, bool), ImageError> {
        let decoded = image::open(src).map_err(|e| ImageError::Decode {
            path: src.to_path_buf(),
            source: e,
        })?;
        let mut img = decoded.to_rgb8();

        let (width, height) = img.dimensions();
        let upscaled = width < self.settings.small_dimension
            || height < self.settings.small_dimension;
        if upscaled {
            img = imageops::resize(&img, width * 2, height * 2, FilterType::CatmullRom);
        }

        let smoothed = imageops::filter3x3(&img, &SMOOTH_KERNEL);
        img = interpolate(&smoothed, &img, self.settings.sharpness);

        let gray_level = mean_luma(&img);
        img = interpolate_uniform(gray_level, &img, self.settings.contrast);

        let grayscale = luma_image(&img);
        img = interpolate(&grayscale, &img, self.settings.saturation);

        img = imageops::filter3x3(&img, &SMOOTH_KERNEL);

        img.save(dst).map_err(|e| ImageError::Encode {
            path: dst.to_path_buf(),
            source: e,
        })?;

        Ok((img.width(), img.height(), upscaled))
    }

    /// Last-resort path: place the unmodified source file in `out_dir`.
    fn copy_through(
        &self,
        src: &Path,
        out_dir: &Path,
        width: u32,
        height: u32,
    ) -> Result<EnhancedImage, ImageError> {
        let file_name = src.file_name().unwrap_or_default();
        let output_path = out_dir.join(file_name);
        std::fs::copy(src, &output_path).map_err(|e| ImageError::Copy {
            path: src.to_path_buf(),
            source: e,
        })?;

        Ok(EnhancedImage {
            source_path: src.to_path_buf(),
            output_path,
            final_width: width,
            final_height: height,
            upscaled: false,
        })
    }
}

/// Per-channel linear interpolation from `base` toward `img`.
///
/// `factor` 0.0 returns `base`, 1.0 returns `img`; factors above 1.0
/// extrapolate past the original, which is what makes the sharpen,
/// contrast and saturation stages push beyond neutral.
fn interpolate(base: &RgbImage, img: &RgbImage, factor: f32) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let b = base.get_pixel(x, y);
        let i = img.get_pixel(x, y);
        for c in 0..3 {
            let value = b.0[c] as f32 + (i.0[c] as f32 - b.0[c] as f32) * factor;
            pixel.0[c] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Interpolation against a uniform gray base, used by the contrast stage.
fn interpolate_uniform(level: u8, img: &RgbImage, factor: f32) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    let base = level as f32;
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let i = img.get_pixel(x, y);
        for c in 0..3 {
            let value = base + (i.0[c] as f32 - base) * factor;
            pixel.0[c] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// ITU-R 601-2 luma of one pixel.
fn luma(pixel: &Rgb<u8>) -> f32 {
    0.299 * pixel.0[0] as f32 + 0.587 * pixel.0[1] as f32 + 0.114 * pixel.0[2] as f32
}

/// Mean luma over the whole image, rounded to the nearest level.
fn mean_luma(img: &RgbImage) -> u8 {
    let sum: f64 = img.pixels().map(|p| luma(p) as f64).sum();
    let count = (img.width() as u64 * img.height() as u64).max(1);
    (sum / count as f64).round().clamp(0.0, 255.0) as u8
}

/// Grayscale rendition of `img` with luma replicated across channels.
fn luma_image(img: &RgbImage) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let l = luma(img.get_pixel(x, y)).round().clamp(0.0, 255.0) as u8;
        pixel.0 = [l, l, l];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassifyReason, ImageKind, RawImageAsset};

    fn write_test_png(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 7 % 256) as u8,
                (y * 13 % 256) as u8,
                ((x + y) * 3 % 256) as u8,
            ])
        });
        img.save(path).unwrap();
    }

    fn classified(path: &Path) -> ClassifiedImage {
        let metadata = std::fs::metadata(path).unwrap();
        let (width, height) = image::image_dimensions(path).unwrap_or((0, 0));
        ClassifiedImage {
            asset: RawImageAsset {
                path: path.to_path_buf(),
                byte_size: metadata.len(),
                width,
                height,
                kind: ImageKind::from_path(path),
            },
            keep: true,
            reason: ClassifyReason::Content,
        }
    }

    #[test]
    fn test_small_image_upscaled_2x() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("fig.png");
        write_test_png(&src, 120, 90);

        let result = Enhancer::default()
            .enhance(&classified(&src), dir.path())
            .unwrap();
        assert!(result.upscaled);
        assert_eq!((result.final_width, result.final_height), (240, 180));
        assert!(result.output_path.ends_with("fig_enhanced.png"));
        assert!(result.output_path.exists());
    }

    #[test]
    fn test_large_image_not_upscaled() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("big.png");
        write_test_png(&src, 1200, 1100);

        let result = Enhancer::default()
            .enhance(&classified(&src), dir.path())
            .unwrap();
        assert!(!result.upscaled);
        assert_eq!((result.final_width, result.final_height), (1200, 1100));
    }

    #[test]
    fn test_enhancement_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("fig.png");
        write_test_png(&src, 64, 48);

        let out_a = dir.path().join("a");
        let out_b = dir.path().join("b");
        std::fs::create_dir_all(&out_a).unwrap();
        std::fs::create_dir_all(&out_b).unwrap();

        let enhancer = Enhancer::default();
        let a = enhancer.enhance(&classified(&src), &out_a).unwrap();
        let b = enhancer.enhance(&classified(&src), &out_b).unwrap();

        let bytes_a = std::fs::read(&a.output_path).unwrap();
        let bytes_b = std::fs::read(&b.output_path).unwrap();
        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn test_source_file_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("fig.png");
        write_test_png(&src, 40, 40);
        let before = std::fs::read(&src).unwrap();

        Enhancer::default()
            .enhance(&classified(&src), dir.path())
            .unwrap();
        assert_eq!(std::fs::read(&src).unwrap(), before);
    }

    #[test]
    fn test_corrupt_image_falls_back_to_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("broken.png");
        std::fs::write(&src, vec![0xDE; 8000]).unwrap();

        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();

        let result = Enhancer::default()
            .enhance(&classified(&src), &out)
            .unwrap();
        assert!(!result.upscaled);
        assert!(result.output_path.ends_with("broken.png"));
        assert_eq!(
            std::fs::read(&result.output_path).unwrap(),
            std::fs::read(&src).unwrap()
        );
    }

    #[test]
    fn test_vector_asset_passes_through_unmodified() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("diagram.svg");
        std::fs::write(&src, b"<svg xmlns='http://www.w3.org/2000/svg'/>").unwrap();

        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();

        let result = Enhancer::default()
            .enhance(&classified(&src), &out)
            .unwrap();
        assert!(result.output_path.ends_with("diagram.svg"));
        assert_eq!(
            std::fs::read(&result.output_path).unwrap(),
            std::fs::read(&src).unwrap()
        );
    }

    #[test]
    fn test_interpolate_factor_one_is_identity() {
        let img = RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 128]));
        let base = luma_image(&img);
        assert_eq!(interpolate(&base, &img, 1.0).as_raw(), img.as_raw());
    }

    #[test]
    fn test_mean_luma_uniform_image() {
        let img = RgbImage::from_pixel(10, 10, Rgb([100, 100, 100]));
        assert_eq!(mean_luma(&img), 100);
    }
}
