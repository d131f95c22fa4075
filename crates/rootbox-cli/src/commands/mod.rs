//! CLI command definitions and dispatch.

pub mod container;
pub mod run;

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use rootbox_common::constants::DIAGNOSTIC_EXIT_CODE;

/// rootbox: pull an image and run a command inside it.
#[derive(Parser, Debug)]
#[command(name = "rootbox", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Log line format on stderr.
    #[arg(
        long,
        global = true,
        value_enum,
        env = "ROOTBOX_LOG_FORMAT",
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pull an image and run a command inside it.
    Run(run::RunArgs),
    /// Isolated child role started by `run`; not meant to be invoked directly.
    #[command(hide = true)]
    Container(container::ContainerArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command cannot run to completion. A target that
/// exits non-zero is reported through the returned exit code instead.
pub fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let code = match cli.command {
        Command::Run(args) => run::execute(args)?,
        Command::Container(args) => container::execute(args)?,
    };
    Ok(ExitCode::from(exit_byte(code)))
}

/// Narrows a child's exit code to what a process can report.
fn exit_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(DIAGNOSTIC_EXIT_CODE)
}
