//! MinerU extraction backend: shells out to the `mineru` CLI.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::extract::{ExtractionBackend, ExtractionError, ExtractionOptions, ExtractionOutput};
use crate::models::{ImageKind, RawImageAsset};

/// Default binary name resolved through PATH
const MINERU_PROGRAM: &str = "mineru";
/// Suggested fix surfaced when the binary is missing
const MINERU_INSTALL_HINT: &str = "pip install \"mineru[core]\"";

/// File extensions the extraction tool is known to emit for images
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg"];

/// Extraction backend that invokes the MinerU CLI as a subprocess.
///
/// MinerU's output directory layout has shifted across releases, so after
/// a successful run the backend probes a fixed list of candidate locations
/// for the `images/` directory and the markdown transcript, then falls
/// back to scanning the whole output tree.
#[derive(Debug, Clone)]
pub struct MineruBackend {
    program: String,
}

impl MineruBackend {
    pub fn new() -> Self {
        Self {
            program: MINERU_PROGRAM.to_string(),
        }
    }

    /// Use a specific binary path instead of resolving `mineru` on PATH.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn build_command(&self, pdf_path: &Path, out_dir: &Path, options: &ExtractionOptions) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-p")
            .arg(pdf_path)
            .arg("-o")
            .arg(out_dir)
            .args(["-m", "auto"])
            .args(["--render-dpi", &options.render_dpi.to_string()])
            .args(["--image-dpi", &options.image_dpi.to_string()])
            .args(["--image-quality", &options.quality.to_string()]);
        if options.keep_vector {
            cmd.arg("--keep-vector");
        }
        if options.no_compress {
            cmd.arg("--no-compress");
        }
        if let Some(lang) = &options.lang {
            cmd.args(["--lang", lang]);
        }
        // Dropping the run future must not leave the tool running
        cmd.kill_on_drop(true);
        cmd
    }

    /// Locate the images directory for `stem` under the tool's output root.
    fn find_images_dir(out_dir: &Path, stem: &str) -> Option<PathBuf> {
        let candidates = [
            out_dir.join(stem).join("auto").join("images"),
            out_dir.join(stem).join("images"),
            out_dir.join("auto").join("images"),
            out_dir.join("images"),
        ];
        for candidate in candidates {
            if candidate.is_dir() {
                return Some(candidate);
            }
        }
        find_dir_named(out_dir, "images")
    }

    /// Locate the markdown transcript for `stem` under the tool's output root.
    fn find_markdown(out_dir: &Path, stem: &str) -> Option<PathBuf> {
        let md_name = format!("{}.md", stem);
        let candidates = [
            out_dir.join(stem).join("auto").join(&md_name),
            out_dir.join(stem).join(&md_name),
            out_dir.join("auto").join(&md_name),
            out_dir.join(&md_name),
        ];
        for candidate in candidates {
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        find_file_with_extension(out_dir, "md")
    }
}

impl Default for MineruBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionBackend for MineruBackend {
    fn id(&self) -> &str {
        "mineru"
    }

    async fn extract(
        &self,
        pdf_path: &Path,
        work_dir: &Path,
        options: &ExtractionOptions,
    ) -> Result<ExtractionOutput, ExtractionError> {
        let out_dir = work_dir.join("mineru_output");
        tokio::fs::create_dir_all(&out_dir)
            .await
            .map_err(|e| ExtractionError::Output {
                path: out_dir.clone(),
                source: e,
            })?;

        let mut cmd = self.build_command(pdf_path, &out_dir, options);

        tracing::info!(
            "running {} at {} dpi on {}",
            self.program,
            options.render_dpi,
            pdf_path.display()
        );

        let output = match timeout(options.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractionError::ToolMissing {
                    tool: self.program.clone(),
                    remediation: MINERU_INSTALL_HINT.to_string(),
                });
            }
            Ok(Err(e)) => {
                return Err(ExtractionError::Spawn {
                    tool: self.program.clone(),
                    source: e,
                });
            }
            Err(_) => {
                return Err(ExtractionError::Timeout {
                    tool: self.program.clone(),
                    seconds: options.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExtractionError::ToolFailed {
                tool: self.program.clone(),
                status: output.status.to_string(),
                pdf: pdf_path.to_path_buf(),
                stderr,
            });
        }

        let stem = pdf_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let images = match Self::find_images_dir(&out_dir, stem) {
            Some(dir) => collect_image_assets(&dir)?,
            None => {
                tracing::warn!("no images directory in {} output", self.program);
                Vec::new()
            }
        };

        let markdown = match Self::find_markdown(&out_dir, stem) {
            Some(path) => match std::fs::read_to_string(&path) {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!("failed reading transcript {}: {}", path.display(), e);
                    None
                }
            },
            None => None,
        };

        tracing::info!(
            "{} produced {} image(s), transcript: {}",
            self.program,
            images.len(),
            markdown.is_some()
        );

        Ok(ExtractionOutput { images, markdown })
    }
}

/// Build [`RawImageAsset`]s for every recognized image file in `dir`.
///
/// Entries are sorted by file name so downstream ordering is stable
/// regardless of directory iteration order.
pub(crate) fn collect_image_assets(dir: &Path) -> Result<Vec<RawImageAsset>, ExtractionError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| ExtractionError::Output {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut assets = Vec::with_capacity(paths.len());
    for path in paths {
        let metadata = std::fs::metadata(&path).map_err(|e| ExtractionError::Output {
            path: path.clone(),
            source: e,
        })?;
        let kind = ImageKind::from_path(&path);

        // Vector files and broken headers get 0x0; the enhancer decides
        // what to do with them, dimensions are not a keep/drop signal.
        let (width, height) = if kind.is_vector() {
            (0, 0)
        } else {
            image::image_dimensions(&path).unwrap_or((0, 0))
        };

        assets.push(RawImageAsset {
            byte_size: metadata.len(),
            width,
            height,
            kind,
            path,
        });
    }

    Ok(assets)
}

/// Depth-first search for a directory with the given name.
fn find_dir_named(root: &Path, name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if path.file_name().and_then(|n| n.to_str()) == Some(name) {
                return Some(path);
            }
            subdirs.push(path);
        }
    }
    subdirs.iter().find_map(|dir| find_dir_named(dir, name))
}

/// Depth-first search for any file with the given extension.
fn find_file_with_extension(root: &Path, ext: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            return Some(path);
        }
    }
    subdirs
        .iter()
        .find_map(|dir| find_file_with_extension(dir, ext))
}
