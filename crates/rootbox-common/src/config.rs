//! Configuration model for a rootbox run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Endpoints and identity used when talking to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry API (without the `/v2` suffix).
    pub registry_url: String,
    /// Token service endpoint.
    pub auth_url: String,
    /// Service name sent with token requests.
    pub service: String,
    /// Client identifier sent with token requests.
    pub client_id: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_url: constants::DEFAULT_REGISTRY_URL.into(),
            auth_url: constants::DEFAULT_AUTH_URL.into(),
            service: constants::DEFAULT_AUTH_SERVICE.into(),
            client_id: constants::DEFAULT_CLIENT_ID.into(),
        }
    }
}

/// How the launcher connects the target's output to the terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StdioMode {
    /// The child shares the parent's descriptors directly.
    #[default]
    Inherit,
    /// The child's stdout and stderr are piped and copied by relay threads.
    Relay,
}

/// Root configuration for one pull-and-run invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootboxConfig {
    /// Registry endpoints.
    pub registry: RegistryConfig,
    /// Parent directory for the root filesystem; the system temp dir if unset.
    pub tmp_dir: Option<PathBuf>,
    /// Check each blob's size and sha256 digest against its descriptor.
    pub verify_blobs: bool,
    /// Remove the root filesystem once the target exits.
    pub remove_rootfs: bool,
    /// Output wiring for the target.
    pub stdio: StdioMode,
}
