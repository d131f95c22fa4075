//! The isolated child role of the re-exec handshake.
//!
//! The launcher starts a fresh copy of the binary inside new namespaces with
//! `container <root> <command> [args...]`. That process changes its root to
//! the image filesystem, moves to `/`, and runs the target. Running the
//! target as a forked child, rather than exec-ing over this process, makes it
//! PID 1 of the new PID namespace.
//!
//! The sequencing lives in [`ContainerChild`] and talks to the kernel only
//! through [`Isolation`], so it runs unprivileged in tests.

use std::path::{Path, PathBuf};
use std::process::Command;

use rootbox_common::config::StdioMode;
use rootbox_common::error::Result;
use rootbox_core::filesystem::chroot;

/// Operations the child role needs from the host.
pub trait Isolation {
    /// Makes `root` the process's filesystem root.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Launch` on failure.
    fn change_root(&mut self, root: &Path) -> Result<()>;

    /// Changes the working directory.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Launch` on failure.
    fn change_dir(&mut self, dir: &Path) -> Result<()>;

    /// Runs the target to completion and returns its exit code.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Launch` if the target cannot be started.
    fn run_target(&mut self, command: &str, args: &[String]) -> Result<i32>;
}

/// Real isolation via `chroot(2)` and a spawned target sharing this
/// process's stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostIsolation;

impl Isolation for HostIsolation {
    fn change_root(&mut self, root: &Path) -> Result<()> {
        chroot::change_root(root)
    }

    fn change_dir(&mut self, dir: &Path) -> Result<()> {
        chroot::change_dir(dir)
    }

    fn run_target(&mut self, command: &str, args: &[String]) -> Result<i32> {
        crate::process::spawn_and_wait(Command::new(command).args(args), StdioMode::Inherit)
    }
}

/// Progress of the child role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildState {
    /// Started with its arguments, nothing done yet.
    Invoked,
    /// Root and working directory switched.
    Isolated,
    /// Target command running.
    Executing,
    /// Target finished with this exit code.
    Exited(i32),
}

/// The child role: a function of (root, command, args).
#[derive(Debug, Clone)]
pub struct ContainerChild {
    root: PathBuf,
    command: String,
    args: Vec<String>,
    state: ChildState,
    history: Vec<ChildState>,
}

impl ContainerChild {
    /// Creates the role from the handshake arguments.
    pub fn new(
        root: impl Into<PathBuf>,
        command: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            root: root.into(),
            command: command.into(),
            args,
            state: ChildState::Invoked,
            history: vec![ChildState::Invoked],
        }
    }

    /// Current state.
    pub const fn state(&self) -> &ChildState {
        &self.state
    }

    /// Every state reached so far, starting with [`ChildState::Invoked`].
    pub fn history(&self) -> &[ChildState] {
        &self.history
    }

    /// Isolates and runs the target, returning its exit code.
    ///
    /// # Errors
    ///
    /// Returns the first failing isolation step; the target is never started
    /// after a failed `chroot` or `chdir`.
    pub fn run(&mut self, isolation: &mut impl Isolation) -> Result<i32> {
        tracing::debug!(
            root = %self.root.display(),
            command = %self.command,
            "child role starting"
        );

        isolation.change_root(&self.root)?;
        isolation.change_dir(Path::new("/"))?;
        self.transition(ChildState::Isolated);

        self.transition(ChildState::Executing);
        let code = isolation.run_target(&self.command, &self.args)?;
        self.transition(ChildState::Exited(code));
        Ok(code)
    }

    fn transition(&mut self, next: ChildState) {
        tracing::debug!(state = ?next, "child state");
        self.state = next.clone();
        self.history.push(next);
    }
}
