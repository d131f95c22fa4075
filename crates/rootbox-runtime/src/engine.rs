//! Pull-and-run pipeline.
//!
//! One [`Engine::run`] call authenticates, fetches the manifest, assembles a
//! fresh root filesystem, and hands it to the [`Launcher`]. The steps run
//! strictly in that order and the first failure ends the run.

use std::path::PathBuf;

use rootbox_common::config::RootboxConfig;
use rootbox_common::error::Result;
use rootbox_common::types::ImageRef;
use rootbox_image::registry::RegistryClient;
use rootbox_image::rootfs::{RootfsBuilder, create_rootfs_dir};

use crate::launcher::Launcher;

/// What the user asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Image to pull.
    pub image: ImageRef,
    /// Absolute path of the target inside the image.
    pub command: String,
    /// Arguments for the target.
    pub args: Vec<String>,
}

impl Invocation {
    /// Creates an invocation from a raw image reference.
    pub fn new(image: &str, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            image: ImageRef::parse(image),
            command: command.into(),
            args,
        }
    }
}

/// Coordinates registry access, root filesystem assembly, and launch.
pub struct Engine {
    client: RegistryClient,
    config: RootboxConfig,
    launcher: Launcher,
}

impl Engine {
    /// Creates an engine that re-executes the running binary for the child.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the running
    /// executable cannot be located.
    pub fn new(config: RootboxConfig) -> Result<Self> {
        let launcher = Launcher::current_exe()?.with_stdio(config.stdio);
        Self::with_launcher(config, launcher)
    }

    /// Creates an engine with an explicit launcher.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Config` if the HTTP client cannot be built.
    pub fn with_launcher(config: RootboxConfig, launcher: Launcher) -> Result<Self> {
        let client = RegistryClient::new(config.registry.clone())?;
        Ok(Self {
            client,
            config,
            launcher,
        })
    }

    /// The configuration this engine runs with.
    pub const fn config(&self) -> &RootboxConfig {
        &self.config
    }

    /// Pulls `image` into a new root filesystem directory and returns its path.
    ///
    /// # Errors
    ///
    /// Returns the first authentication, manifest, download, verification,
    /// or extraction error. An unsupported manifest fails before any
    /// directory is created or blob requested.
    pub fn prepare(&self, image: &ImageRef) -> Result<PathBuf> {
        tracing::info!(image = %image, "pulling image");
        let token = self.client.authenticate(image)?;
        let manifest = self.client.fetch_manifest(image, &token)?;

        let root = create_rootfs_dir(self.config.tmp_dir.as_deref())?;
        RootfsBuilder::new(&self.client)
            .verify_blobs(self.config.verify_blobs)
            .build(image, &manifest, &token, &root)?;
        Ok(root)
    }

    /// Runs the invocation to completion and returns the target's exit code.
    ///
    /// # Errors
    ///
    /// Returns an error from [`Engine::prepare`] or from the launch itself.
    /// A non-zero target exit is not an error.
    pub fn run(&mut self, invocation: &Invocation) -> Result<i32> {
        let root = self.prepare(&invocation.image)?;
        let outcome = self
            .launcher
            .launch(&root, &invocation.command, &invocation.args);

        if self.config.remove_rootfs {
            if let Err(e) = std::fs::remove_dir_all(&root) {
                tracing::warn!(
                    path = %root.display(),
                    error = %e,
                    "failed to remove root filesystem"
                );
            }
        } else {
            tracing::debug!(path = %root.display(), "root filesystem kept");
        }

        let code = outcome?;
        tracing::info!(image = %invocation.image, code, "target exited");
        Ok(code)
    }
}
