//! Linux namespace management for container isolation.
//!
//! A PID namespace created with `unshare(2)` only applies to children forked
//! afterwards, never to the calling process. The launcher therefore unshares
//! in the forked child just before `exec`, and the re-executed child role
//! forks the target so that the target becomes PID 1.

use std::io;

/// Configuration for which namespaces to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceConfig {
    /// Isolate PID namespace.
    pub pid: bool,
    /// Isolate mount namespace.
    pub mount: bool,
    /// Isolate UTS (hostname) namespace.
    pub uts: bool,
}

impl NamespaceConfig {
    /// A configuration that creates no namespaces at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            pid: false,
            mount: false,
            uts: false,
        }
    }

    /// Whether no namespace is requested.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.pid || self.mount || self.uts)
    }

    /// Translates the configuration into `clone(2)` flags.
    #[cfg(target_os = "linux")]
    #[must_use]
    pub fn clone_flags(&self) -> nix::sched::CloneFlags {
        use nix::sched::CloneFlags;

        let mut flags = CloneFlags::empty();
        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        flags
    }
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            pid: true,
            mount: true,
            uts: true,
        }
    }
}

/// Moves the calling process into fresh namespaces.
///
/// Performs a single `unshare(2)` call and touches no heap memory, so it may
/// run in a forked child between `fork(2)` and `exec(2)`. The `io::Error`
/// return type fits `CommandExt::pre_exec` directly.
///
/// # Errors
///
/// Returns the OS error when `unshare(2)` fails, typically `EPERM` without
/// `CAP_SYS_ADMIN`.
#[cfg(target_os = "linux")]
pub fn unshare_namespaces(config: NamespaceConfig) -> io::Result<()> {
    if config.is_empty() {
        return Ok(());
    }
    nix::sched::unshare(config.clone_flags()).map_err(io::Error::from)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error unless no namespace is requested.
#[cfg(not(target_os = "linux"))]
pub fn unshare_namespaces(config: NamespaceConfig) -> io::Result<()> {
    if config.is_empty() {
        return Ok(());
    }
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Linux required for namespace isolation",
    ))
}
