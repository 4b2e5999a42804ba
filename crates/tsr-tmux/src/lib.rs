//! tsr-tmux - Tmux CLI integration for session inventory collection
//!
//! This crate turns the columnar output of `tmux list-sessions`,
//! `list-windows`, and `list-panes` into the typed session tree from
//! `tsr-core`:
//!
//! - `parse` - line-tolerant parsers for the tab-separated `-F` output
//! - `collect` - the `SessionCollector`, which shells out to tmux and
//!   merges the three listings into one tree
//!
//! Parsing never fails a whole batch: malformed lines are skipped with
//! a diagnostic. Collection fails only when the top-level listing does;
//! window and pane enrichment is best-effort per item.

pub mod collect;
pub mod error;
pub mod parse;

pub use collect::{SessionCollector, TmuxCli, TmuxOutput, TmuxRunner};
pub use error::TmuxError;
pub use parse::{parse_panes, parse_sessions, parse_windows};
