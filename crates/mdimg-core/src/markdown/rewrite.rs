//! Single pass over a document: localize every remote image reference.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use super::naming::{final_file_name, find_existing};
use super::scan::{scan, ImageRef};
use crate::control::InterruptFlag;
use crate::downloader::{DownloadError, ImageSource};
use crate::path_safety;
use crate::probe::Dimensions;
use crate::storage;
use crate::url_model::{derive_base_filename, image_extension};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Only reference files already on disk; never fetch.
    pub skip_download: bool,
}

/// An image that could not be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub alt_text: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Image references of any kind.
    pub total: usize,
    pub remote: usize,
    pub downloaded: usize,
    /// Served from a file already in the image directory.
    pub reused: usize,
    /// Left unchanged because downloads were disabled.
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub document: String,
    /// In document order.
    pub failures: Vec<FailureRecord>,
    pub stats: RewriteStats,
    /// The run stopped early; later references were left unchanged.
    pub interrupted: bool,
}

/// Progress reported while rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteEvent {
    Scanned { total: usize, remote: usize },
    /// Starting remote reference `index` (1-based) of `remote`.
    Processing { index: usize, remote: usize, alt_text: String },
    Downloaded { file_name: String, dimensions: Dimensions },
    Reused { file_name: String },
    Skipped { url: String },
    Failed { url: String },
    Interrupted,
}

/// Where images are stored and how the document links to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDir {
    /// Directory on disk.
    pub path: PathBuf,
    /// Prefix used in rewritten links, relative to the output document.
    pub link_prefix: String,
}

impl ImageDir {
    /// Links use the directory's own name, for an output document written
    /// next to it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let link_prefix = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, link_prefix }
    }

    pub fn link(&self, file_name: &str) -> String {
        if self.link_prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.link_prefix, file_name)
        }
    }
}

enum Localized {
    Downloaded(String),
    Reused(String),
    Skipped,
    Failed,
    Interrupted,
}

/// Rewrites documents against one image directory and one image source.
///
/// Base names are claimed per rewriter: the first URL to derive a name owns
/// it, and a different URL deriving the same name gets `-2`, `-3`, ...
pub struct Rewriter<'a, S: ImageSource> {
    source: &'a mut S,
    dir: ImageDir,
    options: RewriteOptions,
    interrupt: InterruptFlag,
    progress: Option<&'a Sender<RewriteEvent>>,
    claims: HashMap<String, String>,
    path_limit: usize,
}

impl<'a, S: ImageSource> Rewriter<'a, S> {
    pub fn new(source: &'a mut S, dir: ImageDir, interrupt: InterruptFlag) -> Self {
        Self {
            source,
            dir,
            options: RewriteOptions::default(),
            interrupt,
            progress: None,
            claims: HashMap::new(),
            path_limit: path_safety::max_path_len(),
        }
    }

    pub fn with_options(mut self, options: RewriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress(mut self, progress: Option<&'a Sender<RewriteEvent>>) -> Self {
        self.progress = progress;
        self
    }

    /// Paths of saved images stay strictly below `limit` bytes. Defaults to
    /// the platform limit.
    pub fn with_path_limit(mut self, limit: usize) -> Self {
        self.path_limit = limit;
        self
    }

    /// Replaces each remote reference with a link to its local copy.
    ///
    /// Local references, failed downloads, skipped images and everything after
    /// an interrupt keep their original text byte for byte.
    pub fn rewrite(&mut self, document: &str) -> RewriteResult {
        let refs = scan(document);
        let mut stats = RewriteStats {
            total: refs.len(),
            remote: refs.iter().filter(|r| r.is_remote()).count(),
            ..RewriteStats::default()
        };
        tracing::info!(
            "found {} image references ({} remote)",
            stats.total,
            stats.remote
        );
        self.emit(RewriteEvent::Scanned {
            total: stats.total,
            remote: stats.remote,
        });

        let mut out = String::with_capacity(document.len());
        let mut failures = Vec::new();
        let mut interrupted = false;
        let mut cursor = 0;
        let mut index = 0;

        for image in &refs {
            out.push_str(&document[cursor..image.span.start]);
            cursor = image.span.end;

            if !image.is_remote() {
                out.push_str(&image.raw);
                continue;
            }
            index += 1;
            if !interrupted && self.interrupt.is_set() {
                interrupted = true;
                self.emit(RewriteEvent::Interrupted);
            }
            if interrupted {
                out.push_str(&image.raw);
                continue;
            }

            self.emit(RewriteEvent::Processing {
                index,
                remote: stats.remote,
                alt_text: image.alt_text.clone(),
            });
            match self.localize(image) {
                Localized::Downloaded(file_name) => {
                    stats.downloaded += 1;
                    out.push_str(&self.local_tag(image, &file_name));
                }
                Localized::Reused(file_name) => {
                    stats.reused += 1;
                    out.push_str(&self.local_tag(image, &file_name));
                }
                Localized::Skipped => {
                    stats.skipped += 1;
                    out.push_str(&image.raw);
                    self.emit(RewriteEvent::Skipped {
                        url: image.url.clone(),
                    });
                }
                Localized::Failed => {
                    stats.failed += 1;
                    out.push_str(&image.raw);
                    failures.push(FailureRecord {
                        alt_text: image.alt_text.clone(),
                        url: image.url.clone(),
                    });
                    self.emit(RewriteEvent::Failed {
                        url: image.url.clone(),
                    });
                }
                Localized::Interrupted => {
                    interrupted = true;
                    out.push_str(&image.raw);
                    self.emit(RewriteEvent::Interrupted);
                }
            }
        }
        out.push_str(&document[cursor..]);

        RewriteResult {
            document: out,
            failures,
            stats,
            interrupted,
        }
    }

    fn localize(&mut self, image: &ImageRef) -> Localized {
        let ext = image_extension(&image.url);
        let derived = derive_base_filename(&image.alt_text, &image.url, &ext);
        let claimed = self.claim(derived, &image.url);

        let safe = path_safety::safe_base_name(&self.dir.path, &claimed, &ext, self.path_limit);
        let base = match safe {
            Ok(safe) => {
                if safe.substituted {
                    tracing::info!(
                        "filename too long, using generated name {} instead",
                        safe.base
                    );
                }
                safe.base
            }
            Err(e) => {
                tracing::warn!("{}: {}", image.url, e);
                return Localized::Failed;
            }
        };

        let claims = &self.claims;
        let existing = find_existing(&self.dir.path, &base, &ext, self.path_limit, |b| {
            claims.contains_key(b)
        });
        if let Some(existing) = existing {
            tracing::info!("file already exists: {}", existing.file_name);
            self.emit(RewriteEvent::Reused {
                file_name: existing.file_name.clone(),
            });
            return Localized::Reused(existing.file_name);
        }

        if self.options.skip_download {
            tracing::debug!("download disabled, leaving {}", image.url);
            return Localized::Skipped;
        }

        let fetched = match self.source.fetch(&image.url) {
            Ok(fetched) => fetched,
            Err(DownloadError::Interrupted) => return Localized::Interrupted,
            Err(e) => {
                tracing::warn!("failed to download {}: {}", image.url, e);
                return Localized::Failed;
            }
        };

        let file_name = final_file_name(
            &self.dir.path,
            &base,
            fetched.dimensions,
            &ext,
            self.path_limit,
        );
        if let Err(e) = storage::write_atomic(&self.dir.path.join(&file_name), &fetched.bytes) {
            tracing::warn!("failed to save {}: {:#}", file_name, e);
            return Localized::Failed;
        }
        tracing::info!("downloaded and saved: {} ({})", file_name, fetched.dimensions);
        self.emit(RewriteEvent::Downloaded {
            file_name: file_name.clone(),
            dimensions: fetched.dimensions,
        });
        Localized::Downloaded(file_name)
    }

    /// Returns the base name `url` owns, uniquifying on collision.
    fn claim(&mut self, base: String, url: &str) -> String {
        let mut candidate = base.clone();
        let mut n = 1;
        loop {
            match self.claims.get(&candidate) {
                Some(owner) if owner == url => return candidate,
                Some(_) => {
                    n += 1;
                    candidate = format!("{}-{}", base, n);
                }
                None => {
                    if n > 1 {
                        tracing::debug!("name {} taken by another URL, using {}", base, candidate);
                    }
                    self.claims.insert(candidate.clone(), url.to_string());
                    return candidate;
                }
            }
        }
    }

    fn local_tag(&self, image: &ImageRef, file_name: &str) -> String {
        format!("![{}]({})", image.alt_text, self.dir.link(file_name))
    }

    fn emit(&self, event: RewriteEvent) {
        if let Some(tx) = self.progress {
            let _ = tx.send(event);
        }
    }
}

/// Convenience for callers that do not need a long-lived [`Rewriter`].
pub fn rewrite_document<S: ImageSource>(
    document: &str,
    dir: &Path,
    source: &mut S,
    options: RewriteOptions,
    interrupt: &InterruptFlag,
) -> RewriteResult {
    Rewriter::new(source, ImageDir::new(dir), interrupt.clone())
        .with_options(options)
        .rewrite(document)
}
