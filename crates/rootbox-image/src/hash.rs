//! SHA-256 content verification.
//!
//! Digests are only blob locators by default. With verification enabled,
//! each downloaded layer file is checked against its descriptor's size and
//! digest before it is extracted.

use std::fs::File;
use std::io;
use std::path::Path;

use rootbox_common::error::{Result, RootboxError};
use sha2::{Digest, Sha256};

use crate::manifest::LayerDescriptor;

const SHA256_PREFIX: &str = "sha256:";

/// Computes the hex-encoded SHA-256 hash of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<String> {
    tracing::debug!(path = %path.display(), "computing SHA-256 hash");
    let io_err = |e| RootboxError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let _ = io::copy(&mut file, &mut hasher).map_err(io_err)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Validates that a file matches the expected `sha256:<hex>` digest.
///
/// Digests using another algorithm are accepted unchecked.
///
/// # Errors
///
/// Returns `RootboxError::HashMismatch` if the hashes do not match.
pub fn validate_hash(path: &Path, expected: &str) -> Result<()> {
    let Some(expected_hex) = expected.strip_prefix(SHA256_PREFIX) else {
        tracing::warn!(digest = expected, "unsupported digest algorithm, skipping hash check");
        return Ok(());
    };
    let actual = hash_file(path)?;
    if actual.eq_ignore_ascii_case(expected_hex) {
        return Ok(());
    }
    Err(RootboxError::HashMismatch {
        resource: expected.to_string(),
        expected: expected_hex.to_string(),
        actual,
    })
}

/// Checks a downloaded layer file against its descriptor's size and digest.
///
/// # Errors
///
/// Returns `RootboxError::SizeMismatch` or `RootboxError::HashMismatch`.
pub fn verify_layer_file(path: &Path, layer: &LayerDescriptor) -> Result<()> {
    let actual = std::fs::metadata(path)
        .map_err(|e| RootboxError::Io {
            path: path.to_path_buf(),
            source: e,
        })?
        .len();
    if u64::try_from(layer.size).ok() != Some(actual) {
        return Err(RootboxError::SizeMismatch {
            digest: layer.digest.clone(),
            expected: layer.size,
            actual,
        });
    }
    validate_hash(path, &layer.digest)
}
