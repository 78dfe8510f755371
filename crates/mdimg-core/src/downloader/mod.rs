//! Image downloader.
//!
//! Resolves CDN-wrapped URLs to their origin, GETs through one reusable
//! session with retry and backoff, and falls back from the resolved URL to the
//! URL as written when the origin refuses or is unreachable. Dimensions are
//! probed from the in-memory bytes so callers can name the file before it is
//! written.

mod session;

pub use session::{HttpSession, BROWSER_USER_AGENT};

use crate::config::MdimgConfig;
use crate::control::{InterruptFlag, Interrupted};
use crate::probe::{probe_dimensions, Dimensions};
use crate::retry::{run_with_retry, FetchError, RetryPolicy};
use crate::storage;
use crate::url_model::resolve_original_url;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Why a fetch produced no image.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Every candidate URL failed after retries.
    #[error("download of {url} failed: {source}")]
    Failed { url: String, source: FetchError },
    /// The user interrupted the run.
    #[error("interrupted by user")]
    Interrupted,
}

impl From<Interrupted> for DownloadError {
    fn from(_: Interrupted) -> Self {
        DownloadError::Interrupted
    }
}

/// Bytes of a successful fetch plus what we learned about them.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub dimensions: Dimensions,
    /// The URL that actually served the bytes (resolved origin or as written).
    pub source_url: String,
}

/// Result of [`Downloader::download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub success: bool,
    /// `0x0` on failure or when the image could not be decoded.
    pub dimensions: Dimensions,
    pub bytes: Option<Vec<u8>>,
}

impl DownloadOutcome {
    fn failed() -> Self {
        Self {
            success: false,
            dimensions: Dimensions::UNKNOWN,
            bytes: None,
        }
    }
}

/// Something that can fetch image bytes by URL.
///
/// The rewriter only depends on this trait; [`Downloader`] is the HTTP
/// implementation.
pub trait ImageSource {
    fn fetch(&mut self, url: &str) -> Result<FetchedImage, DownloadError>;
}

/// Downloader settings.
#[derive(Debug, Clone)]
pub struct DownloaderOptions {
    /// Total time allowed for one request.
    pub timeout: Duration,
    /// Pause after each top-level attempt, to stay under rate limits.
    pub delay: Duration,
    pub retry: RetryPolicy,
    /// Override for the browser-like User-Agent.
    pub user_agent: Option<String>,
}

impl Default for DownloaderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            delay: Duration::from_millis(500),
            retry: RetryPolicy::default(),
            user_agent: None,
        }
    }
}

impl From<&MdimgConfig> for DownloaderOptions {
    fn from(cfg: &MdimgConfig) -> Self {
        Self {
            timeout: cfg.timeout(),
            delay: cfg.delay(),
            retry: RetryPolicy::from(&cfg.retry_config()),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

pub struct Downloader {
    session: HttpSession,
    options: DownloaderOptions,
    interrupt: InterruptFlag,
}

impl Downloader {
    pub fn new(options: DownloaderOptions, interrupt: InterruptFlag) -> Result<Self> {
        let session = HttpSession::new(options.user_agent.as_deref())
            .context("failed to initialize HTTP session")?;
        Ok(Self {
            session,
            options,
            interrupt,
        })
    }

    /// Fetches an image, trying the CDN origin first when `url` is a wrapper.
    ///
    /// If the resolved origin answers with an error status, or cannot be
    /// reached at all, the URL as written is tried once before giving up.
    pub fn fetch(&mut self, url: &str) -> Result<FetchedImage, DownloadError> {
        let resolved = resolve_original_url(url);
        if resolved == url {
            return self.fetch_from(url);
        }

        tracing::info!(wrapper = url, origin = %resolved, "CDN wrapper detected, using origin");
        let err = match self.attempt(&resolved) {
            Ok(bytes) => return Ok(finish(bytes, resolved)),
            Err(FetchError::Interrupted) => return Err(DownloadError::Interrupted),
            Err(e) => e,
        };

        let stage = if err.is_network() { "network" } else { "status" };
        tracing::warn!(
            origin = %resolved,
            fallback = url,
            "origin failed ({}), {} fallback to wrapper URL",
            err,
            stage
        );
        self.fetch_from(url)
    }

    /// Fetches `url` and writes it to `destination`.
    ///
    /// The file is written atomically; on failure nothing is left at
    /// `destination`. Only an interrupt is returned as an error.
    pub fn download(
        &mut self,
        url: &str,
        destination: &Path,
    ) -> Result<DownloadOutcome, Interrupted> {
        let image = match self.fetch(url) {
            Ok(image) => image,
            Err(DownloadError::Interrupted) => return Err(Interrupted),
            Err(e) => {
                tracing::warn!("{}", e);
                return Ok(DownloadOutcome::failed());
            }
        };
        if let Err(e) = storage::write_atomic(destination, &image.bytes) {
            tracing::warn!("saving {} failed: {:#}", destination.display(), e);
            return Ok(DownloadOutcome::failed());
        }
        Ok(DownloadOutcome {
            success: true,
            dimensions: image.dimensions,
            bytes: Some(image.bytes),
        })
    }

    fn fetch_from(&mut self, url: &str) -> Result<FetchedImage, DownloadError> {
        match self.attempt(url) {
            Ok(bytes) => Ok(finish(bytes, url.to_string())),
            Err(FetchError::Interrupted) => Err(DownloadError::Interrupted),
            Err(source) => Err(DownloadError::Failed {
                url: url.to_string(),
                source,
            }),
        }
    }

    /// One top-level attempt: GET with retries, then the pacing delay.
    fn attempt(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("GET {}", url);
        let session = &mut self.session;
        let interrupt = &self.interrupt;
        let timeout = self.options.timeout;
        let result = run_with_retry(&self.options.retry, interrupt, || {
            session.get(url, timeout, interrupt)
        });
        if !matches!(result, Err(FetchError::Interrupted)) {
            // An interrupt here is seen by the caller's next check.
            let _ = interrupt.sleep(self.options.delay);
        }
        result
    }
}

impl ImageSource for Downloader {
    fn fetch(&mut self, url: &str) -> Result<FetchedImage, DownloadError> {
        Downloader::fetch(self, url)
    }
}

fn finish(bytes: Vec<u8>, source_url: String) -> FetchedImage {
    let dimensions = probe_dimensions(&bytes);
    tracing::debug!(
        url = %source_url,
        bytes = bytes.len(),
        %dimensions,
        "fetched image"
    );
    FetchedImage {
        bytes,
        dimensions,
        source_url,
    }
}
