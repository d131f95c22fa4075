//! System-wide constants and default endpoints.

/// Docker Hub registry API base URL.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry-1.docker.io";

/// Docker Hub token service endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://auth.docker.io/token";

/// Service name presented to the token endpoint.
pub const DEFAULT_AUTH_SERVICE: &str = "registry.docker.io";

/// Client identifier presented to the token endpoint.
pub const DEFAULT_CLIENT_ID: &str = "dhcdocker";

/// The only manifest schema the registry client accepts.
pub const MANIFEST_V2_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Repository used when an image reference names none (official images).
pub const DEFAULT_REPOSITORY: &str = "library";

/// Tag used when an image reference names none.
pub const DEFAULT_TAG: &str = "latest";

/// Role token that re-executes the binary as the isolated child.
pub const CONTAINER_ROLE: &str = "container";

/// Exit code for any failure of rootbox itself, as opposed to a propagated
/// target exit code.
pub const DIAGNOSTIC_EXIT_CODE: u8 = 125;

/// Offset added to a signal number when the target dies from a signal.
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Prefix of the per-run root filesystem directory.
pub const ROOTFS_DIR_PREFIX: &str = "rootbox-";

/// Prefix of transient layer archive files.
pub const LAYER_FILE_PREFIX: &str = "layer-";

/// Suffix of transient layer archive files.
pub const LAYER_FILE_SUFFIX: &str = ".tar.gz";

/// Application name used in diagnostics and the HTTP user agent.
pub const APP_NAME: &str = "rootbox";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "rootbox";
