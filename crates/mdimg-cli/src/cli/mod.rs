//! CLI for mdimg.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use mdimg_core::config::{self, MdimgConfig};
use std::path::PathBuf;

use commands::{run_completions, run_convert, run_fetch, run_resolve};

/// Top-level CLI for mdimg.
#[derive(Debug, Parser)]
#[command(name = "mdimg")]
#[command(about = "mdimg: download remote images in Markdown files and point references at local copies", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download remote images in a Markdown file and write `<name>-localimg.md`.
    Convert {
        /// Path to the Markdown file to process.
        file: PathBuf,
        /// Timeout for each image request, in seconds (default 30).
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
        /// Delay after each download attempt, in seconds (default 1.0).
        #[arg(long, value_name = "SECS")]
        delay: Option<f64>,
        /// Skip downloading; only update references to images already on disk.
        #[arg(long, visible_alias = "no-download")]
        skip_download: bool,
    },

    /// Print the original URL behind a CDN-wrapped image URL.
    Resolve {
        /// Image URL, possibly wrapped by a CDN fetch proxy.
        url: String,
    },

    /// Download a single image to a file and print its dimensions.
    Fetch {
        /// Image URL.
        url: String,
        /// Destination file.
        dest: PathBuf,
        /// Request timeout in seconds.
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
    },

    /// Print shell completions.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// How a command finished, for the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Stopped by Ctrl-C after saving what it could.
    Interrupted,
}

/// Command-line flags layered over the config file.
pub(crate) fn apply_overrides(
    cfg: &MdimgConfig,
    timeout: Option<u64>,
    delay: Option<f64>,
    skip_download: bool,
) -> MdimgConfig {
    let mut cfg = cfg.clone();
    if let Some(t) = timeout {
        cfg.timeout_secs = t;
    }
    if let Some(d) = delay {
        cfg.delay_secs = d;
    }
    cfg.skip_download |= skip_download;
    cfg
}

impl CliCommand {
    pub fn run_from_args() -> Result<RunOutcome> {
        let cli = Cli::parse();

        if let CliCommand::Completions { shell } = cli.command {
            run_completions(shell);
            return Ok(RunOutcome::Completed);
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Convert {
                file,
                timeout,
                delay,
                skip_download,
            } => {
                let cfg = apply_overrides(&cfg, timeout, delay, skip_download);
                run_convert(&cfg, &file)
            }
            CliCommand::Resolve { url } => {
                run_resolve(&url);
                Ok(RunOutcome::Completed)
            }
            CliCommand::Fetch { url, dest, timeout } => {
                let cfg = apply_overrides(&cfg, timeout, None, false);
                run_fetch(&cfg, &url, &dest)
            }
            CliCommand::Completions { .. } => Ok(RunOutcome::Completed),
        }
    }
}

#[cfg(test)]
mod tests;
