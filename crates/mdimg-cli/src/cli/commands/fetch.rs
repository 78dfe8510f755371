//! `mdimg fetch` – download one image.

use anyhow::{bail, Result};
use mdimg_core::config::MdimgConfig;
use mdimg_core::control;
use mdimg_core::downloader::{Downloader, DownloaderOptions};
use std::path::Path;

use crate::cli::RunOutcome;

pub fn run_fetch(cfg: &MdimgConfig, url: &str, dest: &Path) -> Result<RunOutcome> {
    let interrupt = control::install_interrupt_handler();
    let mut downloader = Downloader::new(DownloaderOptions::from(cfg), interrupt)?;
    let outcome = match downloader.download(url, dest) {
        Ok(outcome) => outcome,
        Err(_) => return Ok(RunOutcome::Interrupted),
    };
    if !outcome.success {
        bail!("failed to download {}", url);
    }
    if outcome.dimensions.is_known() {
        println!("Saved {} ({})", dest.display(), outcome.dimensions);
    } else {
        println!("Saved {} (dimensions unknown)", dest.display());
    }
    Ok(RunOutcome::Completed)
}
