//! `rootbox container`: the isolated child role of `rootbox run`.
//!
//! Started by the launcher inside fresh namespaces. Changes root to the
//! prepared directory and runs the target as PID 1 of the new PID namespace.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use rootbox_runtime::child::{ContainerChild, HostIsolation};

/// Arguments passed by the launcher.
#[derive(Args, Debug)]
pub struct ContainerArgs {
    /// Root filesystem directory to change root into.
    pub root: PathBuf,

    /// Absolute path of the target inside the root.
    pub command: String,

    /// Arguments for the target.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the child role and returns the target's exit code.
///
/// # Errors
///
/// Returns an error if isolation fails or the target cannot be started.
pub fn execute(args: ContainerArgs) -> anyhow::Result<i32> {
    let mut child = ContainerChild::new(args.root, args.command, args.args);
    child
        .run(&mut HostIsolation)
        .context("container setup failed")
}
