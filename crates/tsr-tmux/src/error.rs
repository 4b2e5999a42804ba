//! Errors from running the tmux CLI.

use thiserror::Error;

use crate::collect::TmuxOutput;

/// Failures while invoking tmux.
///
/// Parsing problems are never errors; only the process side is.
#[derive(Error, Debug)]
pub enum TmuxError {
    /// The tmux binary could not be spawned at all.
    #[error("failed to run tmux: {0}")]
    Spawn(#[source] std::io::Error),

    /// tmux ran but exited unsuccessfully.
    #[error("tmux {command} exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },
}

impl TmuxError {
    /// Builds a `CommandFailed` from a finished tmux invocation.
    ///
    /// A missing exit code (killed by signal) is reported as -1.
    pub fn command_failed(command: &str, output: &TmuxOutput) -> Self {
        Self::CommandFailed {
            command: command.to_string(),
            code: output.code.unwrap_or(-1),
            stderr: output.stderr.trim().to_string(),
        }
    }
}
