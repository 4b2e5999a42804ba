//! Per-machine records and the push/pull wire shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::session::TmuxSession;

/// One reporting host as held by the registry.
///
/// `sessions` always reflects only the most recent push for the machine;
/// `last_seen` is stamped by the registry on every upsert and never by
/// the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// Machine name, the registry key.
    pub name: String,

    /// Host clients should ssh to in order to reach this machine.
    pub ssh_host: String,

    /// User for ssh access.
    pub ssh_user: String,

    /// Latest session inventory, in tmux order.
    #[serde(default)]
    pub sessions: Vec<TmuxSession>,

    /// When the registry last accepted a push for this machine.
    pub last_seen: DateTime<Utc>,
}

/// The body a machine POSTs to report its session inventory.
///
/// On ingest the session list is a total replacement for the machine's
/// previous inventory, never a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    #[serde(default)]
    pub machine_name: String,
    #[serde(default)]
    pub ssh_host: String,
    #[serde(default)]
    pub ssh_user: String,
    #[serde(default)]
    pub sessions: Vec<TmuxSession>,
}

impl PushRequest {
    /// Checks the required identity fields, in wire order.
    ///
    /// The error message is part of the API contract:
    /// `"<field> is required"`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.machine_name.is_empty() {
            return Err(ValidationError::MissingField("machine_name"));
        }
        if self.ssh_host.is_empty() {
            return Err(ValidationError::MissingField("ssh_host"));
        }
        if self.ssh_user.is_empty() {
            return Err(ValidationError::MissingField("ssh_user"));
        }
        Ok(())
    }
}

/// Response body of the pull endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionsResponse {
    /// Every machine whose last push is still within the TTL.
    pub machines: Vec<Machine>,
}
