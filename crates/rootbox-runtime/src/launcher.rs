//! Parent side of the re-exec handshake.
//!
//! The parent re-invokes its own executable with the hidden `container`
//! role, asking the kernel for fresh PID, mount, and UTS namespaces between
//! `fork` and `exec`. The child then isolates itself and runs the target; the
//! parent only waits and forwards the exit code.

use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use rootbox_common::config::StdioMode;
use rootbox_common::constants::CONTAINER_ROLE;
use rootbox_common::error::{Result, RootboxError};
use rootbox_core::namespace::{NamespaceConfig, unshare_namespaces};

use crate::process;

/// Progress of one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchState {
    /// Nothing launched yet.
    Idle,
    /// Root filesystem is ready at this path.
    Built(PathBuf),
    /// Child is being started in new namespaces.
    Spawning,
    /// Child is running; the parent is blocked on it.
    WaitingOnChild,
    /// Child exited with this code.
    Done(i32),
    /// Child could not be started or waited on.
    Failed,
}

/// Starts the child role and waits for it.
#[derive(Debug, Clone)]
pub struct Launcher {
    program: PathBuf,
    namespaces: NamespaceConfig,
    stdio: StdioMode,
    state: LaunchState,
    history: Vec<LaunchState>,
}

impl Launcher {
    /// Creates a launcher that re-executes the running binary.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Launch` if the executable path is unknown.
    pub fn current_exe() -> Result<Self> {
        let program = std::env::current_exe().map_err(|e| RootboxError::Launch {
            message: format!("cannot locate own executable: {e}"),
        })?;
        Ok(Self::new(program))
    }

    /// Creates a launcher for an explicit program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            namespaces: NamespaceConfig::default(),
            stdio: StdioMode::default(),
            state: LaunchState::Idle,
            history: Vec::new(),
        }
    }

    /// Replaces the namespaces requested for the child.
    #[must_use]
    pub const fn with_namespaces(mut self, namespaces: NamespaceConfig) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Sets how the child's stdout and stderr reach the user.
    #[must_use]
    pub const fn with_stdio(mut self, stdio: StdioMode) -> Self {
        self.stdio = stdio;
        self
    }

    /// Current state.
    pub const fn state(&self) -> &LaunchState {
        &self.state
    }

    /// Every state the last launch passed through, in order.
    pub fn history(&self) -> &[LaunchState] {
        &self.history
    }

    /// Builds the child command line: `<program> container <rootfs> <command> [args...]`.
    pub fn child_command(&self, rootfs: &Path, command: &str, args: &[String]) -> Command {
        let mut child = Command::new(&self.program);
        let _ = child.arg(CONTAINER_ROLE).arg(rootfs).arg(command).args(args);

        let namespaces = self.namespaces;
        // SAFETY: the hook runs between fork and exec and only issues a
        // single unshare(2) syscall; it neither allocates nor takes locks.
        unsafe {
            let _ = child.pre_exec(move || unshare_namespaces(namespaces));
        }
        child
    }

    /// Launches the child against `rootfs` and returns its exit code.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Launch` if the child cannot be started, for
    /// example when namespace creation is refused.
    pub fn launch(&mut self, rootfs: &Path, command: &str, args: &[String]) -> Result<i32> {
        self.history.clear();
        self.transition(LaunchState::Built(rootfs.to_path_buf()));
        let mut child = self.child_command(rootfs, command, args);

        self.transition(LaunchState::Spawning);
        tracing::info!(
            rootfs = %rootfs.display(),
            command,
            namespaces = ?self.namespaces,
            "launching isolated child"
        );
        let running = match process::spawn(&mut child, self.stdio) {
            Ok(running) => running,
            Err(e) => {
                self.transition(LaunchState::Failed);
                return Err(e);
            }
        };

        self.transition(LaunchState::WaitingOnChild);
        match running.wait() {
            Ok(code) => {
                self.transition(LaunchState::Done(code));
                Ok(code)
            }
            Err(e) => {
                self.transition(LaunchState::Failed);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: LaunchState) {
        tracing::debug!(state = ?next, "launch state");
        self.state = next.clone();
        self.history.push(next);
    }
}
