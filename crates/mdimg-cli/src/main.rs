use mdimg_core::logging;

mod cli;

use crate::cli::{CliCommand, RunOutcome};

/// Conventional exit status for SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    // Initialize logging as early as possible; stderr if the log file is unavailable.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    // Parse CLI and dispatch.
    match CliCommand::run_from_args() {
        Ok(RunOutcome::Completed) => {}
        Ok(RunOutcome::Interrupted) => {
            eprintln!("Process terminated by user.");
            std::process::exit(EXIT_INTERRUPTED);
        }
        Err(err) => {
            eprintln!("mdimg error: {:#}", err);
            std::process::exit(1);
        }
    }
}
