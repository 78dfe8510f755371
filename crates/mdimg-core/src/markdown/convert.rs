//! File-level driver: read a document, localize its images, save the result.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use super::rewrite::{ImageDir, RewriteEvent, RewriteOptions, RewriteResult, Rewriter};
use crate::control::InterruptFlag;
use crate::downloader::ImageSource;
use crate::storage;

const IMAGE_DIR_SUFFIX: &str = "-images";
const OUTPUT_SUFFIX: &str = "-localimg";
const DEFAULT_OUTPUT_EXTENSION: &str = "md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertReport {
    /// The rewritten document, next to the input.
    pub output_path: PathBuf,
    pub image_dir: PathBuf,
    pub result: RewriteResult,
}

fn input_stem(input: &Path) -> Result<String> {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", input.display()))
}

fn sibling(input: &Path, name: String) -> PathBuf {
    match input.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// `<dir>/<stem>-images` for `<dir>/<stem>.<ext>`.
pub fn image_dir_for(input: &Path) -> Result<PathBuf> {
    Ok(sibling(input, format!("{}{}", input_stem(input)?, IMAGE_DIR_SUFFIX)))
}

/// `<dir>/<stem>-localimg.<ext>`; `.md` when the input has no extension.
pub fn output_path_for(input: &Path) -> Result<PathBuf> {
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_OUTPUT_EXTENSION.to_string());
    Ok(sibling(
        input,
        format!("{}{}.{}", input_stem(input)?, OUTPUT_SUFFIX, ext),
    ))
}

/// Localizes every remote image in the markdown file at `input`.
///
/// The input is never modified. The output document is written even when
/// the run was interrupted, with unprocessed references left as they were.
pub fn convert_file<S: ImageSource>(
    input: &Path,
    source: &mut S,
    options: RewriteOptions,
    interrupt: &InterruptFlag,
    progress: Option<&Sender<RewriteEvent>>,
) -> Result<ConvertReport> {
    if !input.is_file() {
        bail!("file '{}' not found", input.display());
    }
    let document = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let image_dir = image_dir_for(input)?;
    if !image_dir.is_dir() {
        fs::create_dir_all(&image_dir)
            .with_context(|| format!("failed to create {}", image_dir.display()))?;
        tracing::info!("created directory {}", image_dir.display());
    }

    let result = Rewriter::new(source, ImageDir::new(&image_dir), interrupt.clone())
        .with_options(options)
        .with_progress(progress)
        .rewrite(&document);
    if result.interrupted {
        tracing::warn!("interrupted, saving partial progress");
    }

    let output_path = output_path_for(input)?;
    storage::write_atomic(&output_path, result.document.as_bytes())
        .with_context(|| format!("failed to save {}", output_path.display()))?;
    tracing::info!(
        output = %output_path.display(),
        downloaded = result.stats.downloaded,
        reused = result.stats.reused,
        failed = result.stats.failed,
        "document saved"
    );

    Ok(ConvertReport {
        output_path,
        image_dir,
        result,
    })
}
