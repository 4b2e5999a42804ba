//! The session tree reported by tmux: sessions contain windows,
//! windows contain panes.
//!
//! Field names are part of the wire contract and must not change:
//! clients deserialize these shapes from the pull endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single tmux pane within a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmuxPane {
    /// Pane index as assigned by tmux (unique within its window).
    pub index: u32,

    /// Command currently running in the pane (e.g. "vim", "zsh").
    pub current_command: String,

    /// Whether this is the active pane of its window.
    pub active: bool,

    /// Pane title as set by tmux or the running program.
    pub title: String,
}

/// A tmux window and its panes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmuxWindow {
    /// Window index as assigned by tmux (unique within its session).
    pub index: u32,

    /// Window name.
    pub name: String,

    /// Whether this is the active window of its session.
    pub active: bool,

    /// Panes in tmux order. Empty when pane enrichment failed.
    #[serde(default)]
    pub panes: Vec<TmuxPane>,
}

/// A tmux session and its window tree.
///
/// `windows` is the count reported by `tmux list-sessions` and is
/// authoritative; `window_details` may hold fewer entries when
/// per-window enrichment partially failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmuxSession {
    /// Session name (unique per machine, used as the display key).
    pub name: String,

    /// Window count reported by tmux.
    pub windows: u32,

    /// Enriched window records, in tmux order.
    #[serde(default)]
    pub window_details: Vec<TmuxWindow>,

    /// Whether a client is attached to the session.
    pub attached: bool,

    /// Last activity in the session, whole-second resolution.
    #[serde(default = "unix_epoch")]
    pub last_activity: DateTime<Utc>,
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}
