//! Output organizer: lays down the final title-named bundle directory.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::EnhancedImage;

/// Longest directory name produced from a title, in characters
const MAX_TITLE_LEN: usize = 120;

/// Errors raised while writing the final bundle
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to place {path} into the bundle: {source}")]
    Place {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The terminal artifact of one pipeline run
#[derive(Debug, Clone)]
pub struct OutputBundle {
    /// Sanitized title used as the directory and PDF name
    pub title: String,
    pub pdf_path: PathBuf,
    /// Enhanced images in extraction order
    pub image_paths: Vec<PathBuf>,
}

/// Make a title safe to use as a directory/file name.
///
/// Collapses whitespace, replaces filesystem-unsafe characters with
/// underscores, trims leading/trailing separators and truncates on a char
/// boundary. Returns `fallback` when nothing survives.
pub fn sanitize_title(title: &str, fallback: &str) -> String {
    let mut sanitized = String::new();
    let mut last_was_space = false;

    for ch in title.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space && !sanitized.is_empty() {
                sanitized.push(' ');
            }
            last_was_space = true;
            continue;
        }
        last_was_space = false;

        if ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.' | ',' | '(' | ')') {
            sanitized.push(ch);
        } else {
            sanitized.push('_');
        }
    }

    if sanitized.chars().count() > MAX_TITLE_LEN {
        sanitized = sanitized.chars().take(MAX_TITLE_LEN).collect();
    }

    let sanitized = sanitized.trim_matches(['.', '_', ' ']).to_string();

    if sanitized.is_empty() {
        sanitize_title_fallback(fallback)
    } else {
        sanitized
    }
}

/// The fallback id itself may carry a path separator (legacy arXiv ids).
fn sanitize_title_fallback(fallback: &str) -> String {
    fallback.replace(['/', '\\'], "_")
}

/// Assemble the final bundle under `output_root`.
///
/// Creates `<output_root>/<title>/`, copies the PDF in as `<title>.pdf`
/// and moves every enhanced image alongside it, preserving their order.
/// Directory creation is idempotent; an existing bundle is overwritten
/// file by file.
pub fn organize(
    output_root: &Path,
    title: &str,
    fallback_id: &str,
    pdf_path: &Path,
    images: &[EnhancedImage],
) -> Result<OutputBundle, OrganizeError> {
    let title = sanitize_title(title, fallback_id);
    let bundle_dir = output_root.join(&title);

    std::fs::create_dir_all(&bundle_dir).map_err(|e| OrganizeError::CreateDir {
        path: bundle_dir.clone(),
        source: e,
    })?;

    let dest_pdf = bundle_dir.join(format!("{}.pdf", title));
    std::fs::copy(pdf_path, &dest_pdf).map_err(|e| OrganizeError::Place {
        path: pdf_path.to_path_buf(),
        source: e,
    })?;

    let mut image_paths = Vec::with_capacity(images.len());
    for image in images {
        let file_name = image.output_path.file_name().unwrap_or_default();
        let dest = bundle_dir.join(file_name);
        move_file(&image.output_path, &dest).map_err(|e| OrganizeError::Place {
            path: image.output_path.clone(),
            source: e,
        })?;
        image_paths.push(dest);
    }

    tracing::info!(
        "bundle written to {} ({} images)",
        bundle_dir.display(),
        image_paths.len()
    );

    Ok(OutputBundle {
        title,
        pdf_path: dest_pdf,
        image_paths,
    })
}

/// Rename when possible, fall back to copy+remove across filesystems.
fn move_file(src: &Path, dest: &Path) -> std::io::Result<()> {
    if std::fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    std::fs::copy(src, dest)?;
    std::fs::remove_file(src)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "2412.15289";

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(
            sanitize_title("Graphs: Theory/Practice?", ID),
            "Graphs_ Theory_Practice"
        );
    }

    #[test]
    fn test_sanitize_collapses_whitespace() {
        assert_eq!(
            sanitize_title("  A   Title \t With\n Gaps  ", ID),
            "A Title With Gaps"
        );
    }

    #[test]
    fn test_sanitize_truncates_long_titles() {
        let long = "word ".repeat(60);
        let sanitized = sanitize_title(&long, ID);
        assert!(sanitized.chars().count() <= MAX_TITLE_LEN);
        assert!(!sanitized.is_empty());
    }

    #[test]
    fn test_sanitize_empty_falls_back_to_id() {
        assert_eq!(sanitize_title("", ID), ID);
        assert_eq!(sanitize_title("???", ID), ID);
        assert_eq!(sanitize_title("...", ID), ID);
    }

    #[test]
    fn test_sanitize_fallback_handles_legacy_id_separator() {
        assert_eq!(sanitize_title("", "math.GT/0104020"), "math.GT_0104020");
    }

    #[test]
    fn test_organize_lays_out_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        std::fs::create_dir_all(&staging).unwrap();

        let pdf = staging.join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.5").unwrap();

        let mut images = Vec::new();
        for name in ["fig_a_enhanced.png", "fig_b_enhanced.png"] {
            let path = staging.join(name);
            std::fs::write(&path, b"png bytes").unwrap();
            images.push(EnhancedImage {
                source_path: path.clone(),
                output_path: path,
                final_width: 10,
                final_height: 10,
                upscaled: false,
            });
        }

        let root = dir.path().join("out");
        let bundle = organize(&root, "A Tidy Title", ID, &pdf, &images).unwrap();

        assert_eq!(bundle.title, "A Tidy Title");
        assert_eq!(bundle.pdf_path, root.join("A Tidy Title/A Tidy Title.pdf"));
        assert!(bundle.pdf_path.exists());
        assert_eq!(bundle.image_paths.len(), 2);
        assert!(bundle.image_paths[0].ends_with("fig_a_enhanced.png"));
        assert!(bundle.image_paths[1].ends_with("fig_b_enhanced.png"));
        assert!(bundle.image_paths.iter().all(|p| p.exists()));
        // Images were moved, not copied
        assert!(!staging.join("fig_a_enhanced.png").exists());
        // The source PDF is still in place for the caller to clean up
        assert!(pdf.exists());
    }

    #[test]
    fn test_organize_is_idempotent_on_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.5").unwrap();

        let root = dir.path().join("out");
        std::fs::create_dir_all(root.join("Title")).unwrap();

        let bundle = organize(&root, "Title", ID, &pdf, &[]).unwrap();
        assert!(bundle.pdf_path.exists());
    }
}
