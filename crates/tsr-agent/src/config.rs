//! Environment-driven agent configuration.
//!
//! | Variable             | Default        | Meaning                                |
//! |----------------------|----------------|----------------------------------------|
//! | `SERVER_URL`         | required       | Base URL of the registry daemon        |
//! | `SSH_HOST`           | required       | Host clients should ssh to             |
//! | `SSH_USER`           | required       | User for ssh access                    |
//! | `MACHINE_NAME`       | hostname       | Registry key for this machine          |
//! | `PUSH_INTERVAL`      | `10s`          | Delay between pushes                   |
//! | `SKIP_AUTH`          | unset          | `true` pushes without credentials      |
//! | `OIDC_ISSUER`        | required*      | OIDC issuer URL                        |
//! | `OIDC_CLIENT_ID`     | required*      | Client-credentials client ID           |
//! | `OIDC_CLIENT_SECRET` | required*      | Client-credentials client secret       |
//!
//! *required unless `SKIP_AUTH=true`. Set-but-empty variables count as
//! unset.

use std::env;
use std::time::Duration;

use thiserror::Error;

use tsr_core::duration::{parse_duration, DurationParseError};

/// Default delay between pushes.
pub const DEFAULT_PUSH_INTERVAL: &str = "10s";

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub server_url: String,
    pub machine_name: String,
    pub ssh_host: String,
    pub ssh_user: String,
    pub push_interval: Duration,

    /// `None` when `SKIP_AUTH=true`.
    pub oidc: Option<OidcClientConfig>,
}

/// OIDC client-credentials settings.
#[derive(Debug, Clone)]
pub struct OidcClientConfig {
    pub issuer: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Configuration problems that abort startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingVar(&'static str),

    #[error("{0} is required (set SKIP_AUTH=true to disable authentication)")]
    MissingAuthVar(&'static str),

    #[error("MACHINE_NAME is not set and the hostname could not be determined")]
    HostnameUnavailable,

    #[error("invalid {key} {value:?}: {source}")]
    InvalidDuration {
        key: &'static str,
        value: String,
        #[source]
        source: DurationParseError,
    },
}

impl AgentConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| get(key).filter(|value| !value.is_empty());

        let server_url = get("SERVER_URL").ok_or(ConfigError::MissingVar("SERVER_URL"))?;
        let ssh_host = get("SSH_HOST").ok_or(ConfigError::MissingVar("SSH_HOST"))?;
        let ssh_user = get("SSH_USER").ok_or(ConfigError::MissingVar("SSH_USER"))?;

        let machine_name = match get("MACHINE_NAME") {
            Some(name) => name,
            None => sysinfo::System::host_name().ok_or(ConfigError::HostnameUnavailable)?,
        };

        let interval_raw =
            get("PUSH_INTERVAL").unwrap_or_else(|| DEFAULT_PUSH_INTERVAL.to_string());
        let push_interval =
            parse_duration(&interval_raw).map_err(|source| ConfigError::InvalidDuration {
                key: "PUSH_INTERVAL",
                value: interval_raw.clone(),
                source,
            })?;

        let skip_auth = get("SKIP_AUTH").as_deref() == Some("true");
        let oidc = if skip_auth {
            None
        } else {
            Some(OidcClientConfig {
                issuer: get("OIDC_ISSUER").ok_or(ConfigError::MissingAuthVar("OIDC_ISSUER"))?,
                client_id: get("OIDC_CLIENT_ID")
                    .ok_or(ConfigError::MissingAuthVar("OIDC_CLIENT_ID"))?,
                client_secret: get("OIDC_CLIENT_SECRET")
                    .ok_or(ConfigError::MissingAuthVar("OIDC_CLIENT_SECRET"))?,
            })
        };

        Ok(Self {
            server_url,
            machine_name,
            ssh_host,
            ssh_user,
            push_interval,
            oidc,
        })
    }
}
