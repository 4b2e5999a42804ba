//! tsr-agent - Reports the local tmux session inventory to tsrd
//!
//! The agent collects the session tree via `tsr-tmux`, wraps it in a
//! push request, and POSTs it to the registry daemon on a fixed
//! interval:
//! - `config` - environment-driven configuration
//! - `oidc` - client-credentials token source with cached refresh
//! - `push` - the HTTP push client
//!
//! A failed cycle (collection or push) is logged and skipped; the
//! loop itself only stops on shutdown.

pub mod config;
pub mod oidc;
pub mod push;

pub use config::AgentConfig;
pub use oidc::{TokenError, TokenSource};
pub use push::{PushError, Pusher};
