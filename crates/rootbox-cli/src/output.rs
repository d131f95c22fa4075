//! Human-readable rendering of exit codes for diagnostics.

use rootbox_common::constants::{DIAGNOSTIC_EXIT_CODE, SIGNAL_EXIT_BASE};

/// Describes an exit code the way a shell user would read it.
#[must_use]
pub fn describe_exit(code: i32) -> String {
    match code {
        0 => "exited successfully".to_string(),
        c if c == i32::from(DIAGNOSTIC_EXIT_CODE) => {
            format!("exit {c} (rootbox failure or target exit)")
        }
        c if c > SIGNAL_EXIT_BASE && c <= SIGNAL_EXIT_BASE + 64 => {
            format!("killed by signal {} (exit {c})", c - SIGNAL_EXIT_BASE)
        }
        c => format!("exited with code {c}"),
    }
}
