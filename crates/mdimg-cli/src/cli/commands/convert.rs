//! `mdimg convert` – localize the images of one Markdown file.

use anyhow::Result;
use mdimg_core::config::MdimgConfig;
use mdimg_core::control;
use mdimg_core::downloader::{Downloader, DownloaderOptions};
use mdimg_core::markdown::{self, ConvertReport, RewriteEvent, RewriteOptions};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use crate::cli::RunOutcome;

pub fn run_convert(cfg: &MdimgConfig, file: &Path) -> Result<RunOutcome> {
    let interrupt = control::install_interrupt_handler();
    let mut downloader = Downloader::new(DownloaderOptions::from(cfg), interrupt.clone())?;
    let options = RewriteOptions {
        skip_download: cfg.skip_download,
    };

    let (progress_tx, progress_rx) = mpsc::channel::<RewriteEvent>();
    let printer = thread::spawn(move || {
        for event in progress_rx {
            print_event(&event);
        }
    });

    let result = markdown::convert_file(
        file,
        &mut downloader,
        options,
        &interrupt,
        Some(&progress_tx),
    );
    drop(progress_tx);
    let _ = printer.join();

    let report = result?;
    print_summary(&report);
    if report.result.interrupted {
        Ok(RunOutcome::Interrupted)
    } else {
        println!("Process completed successfully.");
        Ok(RunOutcome::Completed)
    }
}

fn alt_label(alt_text: &str) -> &str {
    if alt_text.is_empty() {
        "No alt text"
    } else {
        alt_text
    }
}

fn print_event(event: &RewriteEvent) {
    match event {
        RewriteEvent::Scanned { total, remote } => {
            println!("Found {} image references ({} remote)", total, remote);
        }
        RewriteEvent::Processing {
            index,
            remote,
            alt_text,
        } => println!(
            "Processing image {}/{}: {}",
            index,
            remote,
            alt_label(alt_text)
        ),
        RewriteEvent::Downloaded {
            file_name,
            dimensions,
        } => {
            if dimensions.is_known() {
                println!("Downloaded and saved: {} ({})", file_name, dimensions);
            } else {
                println!("Downloaded and saved: {}", file_name);
            }
        }
        RewriteEvent::Reused { file_name } => println!("File already exists: {}", file_name),
        RewriteEvent::Skipped { url } => println!("Not downloaded (downloads disabled): {}", url),
        RewriteEvent::Failed { url } => println!("Failed to download: {}", url),
        RewriteEvent::Interrupted => {
            println!("\nDownload interrupted by user. Saving partial progress...")
        }
    }
}

fn print_summary(report: &ConvertReport) {
    let result = &report.result;
    println!("\nProcessed file saved to: {}", report.output_path.display());
    println!(
        "{} downloaded, {} already present, {} skipped, {} failed",
        result.stats.downloaded, result.stats.reused, result.stats.skipped, result.stats.failed
    );
    if !result.failures.is_empty() {
        println!("\n{} images failed to download:", result.failures.len());
        for failure in &result.failures {
            println!("- {}: {}", alt_label(&failure.alt_text), failure.url);
        }
    }
}
