//! Parsers for the tab-separated output of `tmux ... -F`.
//!
//! Each listing emits one line per entity with exactly four fields.
//! The parsers are deliberately forgiving: a line that does not split
//! into four fields, or whose typed fields do not parse, is skipped
//! with a `warn!` diagnostic and never aborts the batch. Boolean flags
//! are the literal string `"1"`; anything else is false. Activity
//! timestamps are whole-second Unix epoch values.

use chrono::DateTime;
use tracing::warn;

use tsr_core::{TmuxPane, TmuxSession, TmuxWindow};

/// Splits a line into exactly four tab-separated fields.
///
/// The limit of 4 means tabs inside the final field (pane titles, for
/// example) are absorbed into it rather than producing extra fields.
fn split_fields(line: &str) -> Option<[&str; 4]> {
    let mut parts = line.splitn(4, '\t');
    Some([parts.next()?, parts.next()?, parts.next()?, parts.next()?])
}

/// Parses `tmux list-sessions` output.
///
/// Line format: `session_name \t window_count \t attached(0|1) \t activity_epoch`.
pub fn parse_sessions(output: &str) -> Vec<TmuxSession> {
    let mut sessions = Vec::new();

    for line in output.trim().lines() {
        if line.is_empty() {
            continue;
        }

        let Some([name, windows, attached, activity]) = split_fields(line) else {
            warn!(line, "malformed tmux session line, skipping");
            continue;
        };

        let Ok(windows) = windows.parse::<u32>() else {
            warn!(line, "invalid window count, skipping line");
            continue;
        };

        let Ok(epoch) = activity.parse::<i64>() else {
            warn!(line, "invalid activity timestamp, skipping line");
            continue;
        };
        let Some(last_activity) = DateTime::from_timestamp(epoch, 0) else {
            warn!(line, "activity timestamp out of range, skipping line");
            continue;
        };

        sessions.push(TmuxSession {
            name: name.to_string(),
            windows,
            window_details: Vec::new(),
            attached: attached == "1",
            last_activity,
        });
    }

    sessions
}

/// Parses `tmux list-windows` output.
///
/// Line format: `window_index \t window_name \t active(0|1) \t pane_count`.
/// The pane count is present in the format string but not used; panes
/// are listed separately.
pub fn parse_windows(output: &str) -> Vec<TmuxWindow> {
    let mut windows = Vec::new();

    for line in output.trim().lines() {
        if line.is_empty() {
            continue;
        }

        let Some([index, name, active, _panes]) = split_fields(line) else {
            warn!(line, "malformed tmux window line, skipping");
            continue;
        };

        let Ok(index) = index.parse::<u32>() else {
            warn!(line, "invalid window index, skipping line");
            continue;
        };

        windows.push(TmuxWindow {
            index,
            name: name.to_string(),
            active: active == "1",
            panes: Vec::new(),
        });
    }

    windows
}

/// Parses `tmux list-panes` output.
///
/// Line format: `pane_index \t current_command \t active(0|1) \t title`.
pub fn parse_panes(output: &str) -> Vec<TmuxPane> {
    let mut panes = Vec::new();

    for line in output.trim().lines() {
        if line.is_empty() {
            continue;
        }

        let Some([index, current_command, active, title]) = split_fields(line) else {
            warn!(line, "malformed tmux pane line, skipping");
            continue;
        };

        let Ok(index) = index.parse::<u32>() else {
            warn!(line, "invalid pane index, skipping line");
            continue;
        };

        panes.push(TmuxPane {
            index,
            current_command: current_command.to_string(),
            active: active == "1",
            title: title.to_string(),
        });
    }

    panes
}
