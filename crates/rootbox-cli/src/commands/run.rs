//! `rootbox run`: pull an image and run a command inside it.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use rootbox_common::config::{RegistryConfig, RootboxConfig, StdioMode};
use rootbox_common::constants;
use rootbox_runtime::engine::{Engine, Invocation};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image reference: `name`, `name:tag`, or `repository/name[:tag]`.
    pub image: String,

    /// Absolute path of the command inside the image.
    pub command: String,

    /// Arguments passed to the command verbatim.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Registry API base URL.
    #[arg(long, env = "ROOTBOX_REGISTRY_URL", default_value = constants::DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    /// Token service endpoint.
    #[arg(long, env = "ROOTBOX_AUTH_URL", default_value = constants::DEFAULT_AUTH_URL)]
    pub auth_url: String,

    /// Service name sent to the token endpoint.
    #[arg(long, env = "ROOTBOX_AUTH_SERVICE", default_value = constants::DEFAULT_AUTH_SERVICE)]
    pub auth_service: String,

    /// Parent directory for the root filesystem (system temp dir if unset).
    #[arg(long, env = "ROOTBOX_TMP_DIR")]
    pub tmp_dir: Option<PathBuf>,

    /// Check every layer's size and sha256 digest before extracting it.
    #[arg(long)]
    pub verify: bool,

    /// Pipe the command's stdout and stderr through relay threads.
    #[arg(long)]
    pub relay: bool,

    /// Remove the root filesystem after the command exits.
    #[arg(long)]
    pub rm: bool,
}

impl RunArgs {
    /// Builds the run configuration from the parsed options.
    #[must_use]
    pub fn config(&self) -> RootboxConfig {
        RootboxConfig {
            registry: RegistryConfig {
                registry_url: self.registry_url.clone(),
                auth_url: self.auth_url.clone(),
                service: self.auth_service.clone(),
                ..RegistryConfig::default()
            },
            tmp_dir: self.tmp_dir.clone(),
            verify_blobs: self.verify,
            remove_rootfs: self.rm,
            stdio: if self.relay {
                StdioMode::Relay
            } else {
                StdioMode::Inherit
            },
        }
    }

    /// Builds the invocation from the positional arguments.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation::new(&self.image, self.command.clone(), self.args.clone())
    }
}

/// Executes the `run` command and returns the target's exit code.
///
/// # Errors
///
/// Returns an error if pulling the image or launching the command fails.
pub fn execute(args: RunArgs) -> anyhow::Result<i32> {
    let invocation = args.invocation();
    let config = args.config();
    tracing::debug!(?config, "run configuration");

    let mut engine = Engine::new(config).context("failed to initialize")?;
    let code = engine
        .run(&invocation)
        .with_context(|| format!("failed to run {} in {}", invocation.command, invocation.image))?;

    if code != 0 {
        tracing::info!(
            image = %invocation.image,
            status = %crate::output::describe_exit(code),
            "command failed"
        );
    }
    Ok(code)
}
