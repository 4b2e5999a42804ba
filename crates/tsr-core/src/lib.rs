//! tsr-core - Shared types for tmux session inventory reporting
//!
//! This crate provides the domain types shared between the registry
//! daemon (tsrd) and the reporting agent (tsr-agent): the session tree
//! reported by tmux, the per-machine record held by the registry, and
//! the push/pull wire shapes.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod duration;
pub mod error;
pub mod machine;
pub mod session;

// Re-exports for convenience
pub use duration::parse_duration;
pub use error::ValidationError;
pub use machine::{Machine, PushRequest, SessionsResponse};
pub use session::{TmuxPane, TmuxSession, TmuxWindow};
