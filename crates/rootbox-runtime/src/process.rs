//! Process spawning and exit status mapping.

use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus, Stdio};

use rootbox_common::config::StdioMode;
use rootbox_common::constants::{DIAGNOSTIC_EXIT_CODE, SIGNAL_EXIT_BASE};
use rootbox_common::error::{Result, RootboxError};

/// Maps a finished process's status to the exit code rootbox should report.
///
/// A normal exit keeps its code; death by signal `n` becomes `128 + n`.
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| SIGNAL_EXIT_BASE + signal))
        .unwrap_or(i32::from(DIAGNOSTIC_EXIT_CODE))
}

/// A started process whose exit has not been collected yet.
#[derive(Debug)]
pub struct Running {
    child: Child,
    program: String,
    stdio: StdioMode,
}

impl Running {
    /// OS process id of the child.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Blocks until the process exits and returns its exit code.
    ///
    /// With [`StdioMode::Relay`] the piped stdout and stderr are copied by
    /// relay threads while waiting.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Launch` if waiting or relaying fails. A
    /// non-zero exit is not an error.
    pub fn wait(mut self) -> Result<i32> {
        let status = match self.stdio {
            StdioMode::Inherit => self.child.wait(),
            StdioMode::Relay => crate::relay::relay_and_wait(self.child),
        }
        .map_err(|e| RootboxError::Launch {
            message: format!("failed to wait for {}: {e}", self.program),
        })?;

        let code = exit_code(status);
        tracing::debug!(program = %self.program, code, "process exited");
        Ok(code)
    }
}

/// Starts `command` without waiting for it.
///
/// stdin is always inherited. With [`StdioMode::Relay`] stdout and stderr are
/// piped for [`Running::wait`] to relay.
///
/// # Errors
///
/// Returns `RootboxError::Launch` if the process cannot be started.
pub fn spawn(command: &mut Command, stdio: StdioMode) -> Result<Running> {
    let program = command.get_program().to_string_lossy().into_owned();
    let (stdout, stderr) = match stdio {
        StdioMode::Inherit => (Stdio::inherit(), Stdio::inherit()),
        StdioMode::Relay => (Stdio::piped(), Stdio::piped()),
    };

    let child = command
        .stdin(Stdio::inherit())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(|e| RootboxError::Launch {
            message: format!("failed to run {program}: {e}"),
        })?;
    tracing::debug!(program = %program, pid = child.id(), "process started");

    Ok(Running {
        child,
        program,
        stdio,
    })
}

/// Spawns `command`, waits for it, and returns its exit code.
///
/// # Errors
///
/// Returns `RootboxError::Launch` if the process cannot be started or waited
/// on. A non-zero exit is not an error.
pub fn spawn_and_wait(command: &mut Command, stdio: StdioMode) -> Result<i32> {
    spawn(command, stdio)?.wait()
}
