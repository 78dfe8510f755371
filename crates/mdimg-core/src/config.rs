use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::DEFAULT_RETRYABLE_STATUS_CODES;

/// Retry policy parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt for each URL.
    pub max_retries: u32,
    /// HTTP status codes that trigger a retry.
    pub retryable_status_codes: Vec<u16>,
    /// Base delay in seconds for exponential backoff (doubled per retry).
    pub backoff_base_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.to_vec(),
            backoff_base_secs: 1.0,
            max_backoff_secs: 120,
        }
    }
}

/// Global configuration loaded from `~/.config/mdimg/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdimgConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Pause after each HTTP attempt, in seconds, to stay under rate limits.
    pub delay_secs: f64,
    /// Only rewrite references to images already on disk; never fetch.
    #[serde(default)]
    pub skip_download: bool,
    /// Override for the browser-like User-Agent header.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for MdimgConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            delay_secs: 1.0,
            skip_download: false,
            user_agent: None,
            retry: None,
        }
    }
}

impl MdimgConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Negative or non-finite values are treated as no delay.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs).unwrap_or(Duration::ZERO)
    }

    /// Retry settings, falling back to defaults when the section is absent.
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mdimg")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MdimgConfig> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Like [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<MdimgConfig> {
    if !path.exists() {
        let default_cfg = MdimgConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: MdimgConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    // curl treats a zero timeout as no timeout at all.
    anyhow::ensure!(
        cfg.timeout_secs > 0,
        "invalid config {}: timeout_secs must be at least 1",
        path.display()
    );
    Ok(cfg)
}
