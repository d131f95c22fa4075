//! Unified error types for the rootbox workspace.
//!
//! Every stage of the pull-and-run pipeline reports failures through
//! [`RootboxError`]. All variants are fatal: nothing in the workspace retries.
//! A target command exiting non-zero is not an error and never appears here.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum RootboxError {
    /// The token exchange failed or its response could not be decoded.
    #[error("registry authentication failed for {scope}: {message}")]
    Auth {
        /// Pull scope the token was requested for.
        scope: String,
        /// Description of the failure.
        message: String,
    },

    /// The manifest request or its decoding failed.
    #[error("manifest fetch failed for {image}: {message}")]
    Manifest {
        /// Image reference whose manifest was requested.
        image: String,
        /// Description of the failure.
        message: String,
    },

    /// The registry answered with a manifest schema rootbox does not model.
    #[error("unsupported manifest media type: want {expected}, got {actual}")]
    UnsupportedMediaType {
        /// The single accepted media type.
        expected: String,
        /// Media type found in the manifest document.
        actual: String,
    },

    /// A layer blob could not be downloaded or written.
    #[error("blob download failed for {digest}: {message}")]
    Blob {
        /// Digest of the blob.
        digest: String,
        /// Description of the failure.
        message: String,
    },

    /// Downloaded blob length differs from the manifest's declared size.
    #[error("blob {digest} size mismatch: manifest declares {expected} bytes, received {actual}")]
    SizeMismatch {
        /// Digest of the blob.
        digest: String,
        /// Size declared by the layer descriptor.
        expected: i64,
        /// Number of bytes actually received.
        actual: u64,
    },

    /// A hash validation failed.
    #[error("hash mismatch for {resource}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Resource that failed validation.
        resource: String,
        /// Expected hash value.
        expected: String,
        /// Actual computed hash value.
        actual: String,
    },

    /// A layer archive could not be unpacked.
    #[error("layer extraction failed at {path}: {source}")]
    Extract {
        /// Archive or destination path involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Namespace setup, chroot, or spawning the target failed.
    #[error("launch failed: {message}")]
    Launch {
        /// Description of the failed step.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Coarse classification of a [`RootboxError`] by pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Token exchange.
    Auth,
    /// Manifest request, decoding, or media type check.
    Manifest,
    /// Blob download, write, or verification.
    Blob,
    /// Archive unpacking.
    Extract,
    /// Namespace, chroot, or exec setup.
    Launch,
    /// Local I/O, configuration, or serialization outside the stages above.
    Other,
}

impl RootboxError {
    /// Returns the pipeline stage this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Auth { .. } => FailureKind::Auth,
            Self::Manifest { .. } | Self::UnsupportedMediaType { .. } => FailureKind::Manifest,
            Self::Blob { .. } | Self::SizeMismatch { .. } | Self::HashMismatch { .. } => {
                FailureKind::Blob
            }
            Self::Extract { .. } => FailureKind::Extract,
            Self::Launch { .. } => FailureKind::Launch,
            Self::Io { .. } | Self::Config { .. } | Self::Serialization { .. } => {
                FailureKind::Other
            }
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RootboxError>;
