//! Denotify - convert an Obsidian vault into a Denote note collection
//!
//! Notes are renamed to `YYYYMMDDTHHMMSS--slug__keywords.ext`, links and
//! embeds are rewritten to the new names, and referenced assets are placed
//! according to the asset policy.

mod cli;
mod commands;

use std::env;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use cli::Cli;
use denotify_core::error::{DenotifyError, ExitCode as DenotifyExitCode};
use denotify_core::logging;

fn main() -> ExitCode {
    let start = Instant::now();

    let argv_json = argv_requests_json();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // clap fails before `Cli.json` exists; honour --json from argv
            if argv_json {
                let error = match err.kind() {
                    clap::error::ErrorKind::DisplayHelp
                    | clap::error::ErrorKind::DisplayVersion => err.exit(),
                    clap::error::ErrorKind::ValueValidation
                    | clap::error::ErrorKind::InvalidValue
                    | clap::error::ErrorKind::UnknownArgument
                    | clap::error::ErrorKind::MissingRequiredArgument
                    | clap::error::ErrorKind::ArgumentConflict => {
                        DenotifyError::UsageError(err.to_string())
                    }
                    _ => DenotifyError::Other(err.to_string()),
                };

                eprintln!("{}", error.to_json());
                return ExitCode::from(error.exit_code() as u8);
            }

            err.exit();
        }
    };

    if let Err(e) = logging::init_tracing(cli.verbose, cli.log_level.as_deref(), cli.log_json) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::debug!(elapsed = ?start.elapsed(), "parse_args");

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::SeqCst);
    }) {
        tracing::debug!(error = %e, "could not install interrupt handler");
    }

    match commands::convert::execute(&cli, cancel) {
        Ok(report) => {
            cli::output::print_report(&cli, &report);
            tracing::debug!(elapsed = ?start.elapsed(), "total");
            if report.is_success() {
                ExitCode::from(DenotifyExitCode::Success as u8)
            } else {
                ExitCode::from(DenotifyExitCode::Failure as u8)
            }
        }
        Err(e) => {
            let exit_code = e.exit_code();

            if cli.json {
                eprintln!("{}", e.to_json());
            } else if !cli.quiet {
                eprintln!("error: {}", e);
            }

            ExitCode::from(exit_code as u8)
        }
    }
}

fn argv_requests_json() -> bool {
    env::args().skip(1).any(|arg| arg == "--json")
}
