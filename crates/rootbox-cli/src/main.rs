//! # rootbox
//!
//! Pulls an image from a Docker v2 registry, unpacks it into a fresh
//! directory, and runs one command inside it in new PID, mount, and UTS
//! namespaces.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use rootbox_common::constants::{BIN_NAME, DIAGNOSTIC_EXIT_CODE};
use rootbox_common::error::RootboxError;

use crate::commands::{Cli, LogFormat};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match commands::execute(cli) {
        Ok(code) => code,
        Err(e) => {
            report_failure(&e);
            ExitCode::from(DIAGNOSTIC_EXIT_CODE)
        }
    }
}

/// Prints the error chain as `rootbox: <error chain>`, independent of the
/// log filter.
#[allow(clippy::print_stderr)]
fn report_failure(error: &anyhow::Error) {
    let kind = error.downcast_ref::<RootboxError>().map(RootboxError::kind);
    tracing::debug!(kind = ?kind, error = ?error, "run failed");
    eprintln!("{BIN_NAME}: {error:#}");
}

/// Logs go to stderr so the target's stdout is never mixed with them.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
