//! Session tree collection against a live tmux server.
//!
//! The collector issues one `list-sessions` call, then one
//! `list-windows` per session and one `list-panes` per window, and
//! merges the results. Only the top-level listing can fail the cycle;
//! enrichment failures leave a partial tree and a diagnostic.
//!
//! The tmux invocation itself sits behind the [`TmuxRunner`] trait so
//! tests can script outputs without a tmux server.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use tsr_core::{TmuxPane, TmuxSession, TmuxWindow};

use crate::error::TmuxError;
use crate::parse::{parse_panes, parse_sessions, parse_windows};

/// Format string for `tmux list-sessions -F`.
pub const SESSION_FORMAT: &str =
    "#{session_name}\t#{session_windows}\t#{session_attached}\t#{session_activity}";

/// Format string for `tmux list-windows -F`.
pub const WINDOW_FORMAT: &str =
    "#{window_index}\t#{window_name}\t#{window_active}\t#{window_panes}";

/// Format string for `tmux list-panes -F`.
pub const PANE_FORMAT: &str =
    "#{pane_index}\t#{pane_current_command}\t#{pane_active}\t#{pane_title}";

/// Exit code tmux uses for "no server running" on `list-sessions`.
const NO_SERVER_EXIT_CODE: i32 = 1;

/// Captured result of one tmux invocation.
#[derive(Debug, Clone)]
pub struct TmuxOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl TmuxOutput {
    /// True when tmux exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Seam for invoking tmux.
///
/// The production implementation is [`TmuxCli`]; tests substitute a
/// scripted runner.
#[async_trait]
pub trait TmuxRunner: Send + Sync {
    /// Runs `tmux <args>` and captures its output.
    ///
    /// Only a failure to spawn the process is an `Err`; a non-zero
    /// exit is reported through [`TmuxOutput::code`] because callers
    /// interpret specific codes.
    async fn run(&self, args: &[&str]) -> Result<TmuxOutput, TmuxError>;
}

/// Runs the real tmux binary on the local host.
#[derive(Debug, Clone, Copy, Default)]
pub struct TmuxCli;

#[async_trait]
impl TmuxRunner for TmuxCli {
    async fn run(&self, args: &[&str]) -> Result<TmuxOutput, TmuxError> {
        let output = Command::new("tmux")
            .args(args)
            .output()
            .await
            .map_err(TmuxError::Spawn)?;

        Ok(TmuxOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Collects the complete session tree for the local host.
pub struct SessionCollector<R: TmuxRunner> {
    runner: R,
}

impl SessionCollector<TmuxCli> {
    /// Creates a collector that shells out to the local tmux binary.
    pub fn new() -> Self {
        Self::with_runner(TmuxCli)
    }
}

impl Default for SessionCollector<TmuxCli> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: TmuxRunner> SessionCollector<R> {
    /// Creates a collector over a custom runner.
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// Lists all sessions, enriched with window and pane details.
    ///
    /// A tmux server that is not running yields an empty inventory.
    /// Any other top-level failure aborts the cycle. Per-session and
    /// per-window enrichment failures are logged and leave the entity
    /// with an empty child list.
    pub async fn collect(&self) -> Result<Vec<TmuxSession>, TmuxError> {
        let output = self
            .runner
            .run(&["list-sessions", "-F", SESSION_FORMAT])
            .await?;

        if !output.success() {
            if output.code == Some(NO_SERVER_EXIT_CODE) {
                debug!("tmux server not running, reporting empty inventory");
                return Ok(Vec::new());
            }
            return Err(TmuxError::command_failed("list-sessions", &output));
        }

        let mut sessions = parse_sessions(&output.stdout);

        for session in &mut sessions {
            match self.list_windows(&session.name).await {
                Ok(windows) => session.window_details = windows,
                Err(error) => {
                    warn!(session = %session.name, %error, "failed to list windows for session");
                }
            }
        }

        Ok(sessions)
    }

    /// Lists the windows of one session, each enriched with its panes.
    async fn list_windows(&self, session_name: &str) -> Result<Vec<TmuxWindow>, TmuxError> {
        let output = self
            .runner
            .run(&["list-windows", "-t", session_name, "-F", WINDOW_FORMAT])
            .await?;

        if !output.success() {
            return Err(TmuxError::command_failed("list-windows", &output));
        }

        let mut windows = parse_windows(&output.stdout);

        for window in &mut windows {
            match self.list_panes(session_name, window.index).await {
                Ok(panes) => window.panes = panes,
                Err(error) => {
                    warn!(
                        session = %session_name,
                        window = window.index,
                        %error,
                        "failed to list panes"
                    );
                }
            }
        }

        Ok(windows)
    }

    /// Lists the panes of one window.
    async fn list_panes(
        &self,
        session_name: &str,
        window_index: u32,
    ) -> Result<Vec<TmuxPane>, TmuxError> {
        let target = format!("{session_name}:{window_index}");
        let output = self
            .runner
            .run(&["list-panes", "-t", &target, "-F", PANE_FORMAT])
            .await?;

        if !output.success() {
            return Err(TmuxError::command_failed("list-panes", &output));
        }

        Ok(parse_panes(&output.stdout))
    }
}
