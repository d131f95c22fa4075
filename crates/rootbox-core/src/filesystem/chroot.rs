//! Root filesystem switching via `chroot(2)`.
//!
//! `chroot` alone leaves the working directory outside the new root, so
//! callers follow it with [`change_dir`] to `/`.

use std::path::Path;

use rootbox_common::error::{Result, RootboxError};

/// Changes the process root to `new_root`.
///
/// # Errors
///
/// Returns `RootboxError::Launch` if `chroot(2)` fails, typically `EPERM`
/// without `CAP_SYS_CHROOT`.
#[cfg(target_os = "linux")]
pub fn change_root(new_root: &Path) -> Result<()> {
    nix::unistd::chroot(new_root).map_err(|e| RootboxError::Launch {
        message: format!("chroot into {} failed: {e}", new_root.display()),
    })?;
    tracing::debug!(root = %new_root.display(), "changed root");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: chroot isolation requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn change_root(_new_root: &Path) -> Result<()> {
    Err(RootboxError::Launch {
        message: "Linux required for chroot isolation".into(),
    })
}

/// Changes the working directory.
///
/// # Errors
///
/// Returns `RootboxError::Launch` if `chdir(2)` fails.
pub fn change_dir(dir: &Path) -> Result<()> {
    std::env::set_current_dir(dir).map_err(|e| RootboxError::Launch {
        message: format!("chdir to {} failed: {e}", dir.display()),
    })
}
