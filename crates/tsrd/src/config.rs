//! Environment-driven daemon configuration.
//!
//! | Variable             | Default        | Meaning                              |
//! |----------------------|----------------|--------------------------------------|
//! | `LISTEN_ADDR`        | `0.0.0.0:8080` | HTTP listen address                  |
//! | `SESSION_TTL`        | `60s`          | Machine freshness window             |
//! | `SKIP_AUTH`          | unset          | `true` disables authentication       |
//! | `OIDC_ISSUER`        | required*      | OIDC issuer URL                      |
//! | `OIDC_CLIENT_IDS`    | required*      | Comma-separated accepted audiences   |
//! | `OIDC_CLIENT_ID`     | required*      | Introspection client ID              |
//! | `OIDC_CLIENT_SECRET` | required*      | Introspection client secret          |
//!
//! *required unless `SKIP_AUTH=true`. Set-but-empty variables count as
//! unset.

use std::env;
use std::time::Duration;

use thiserror::Error;

use tsr_core::duration::{parse_duration, DurationParseError};

/// Default HTTP listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Default machine freshness window.
pub const DEFAULT_SESSION_TTL: &str = "60s";

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub session_ttl: Duration,

    /// `None` when `SKIP_AUTH=true`.
    pub oidc: Option<OidcConfig>,
}

/// OIDC settings for the authentication boundary.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub issuer: String,
    pub accepted_client_ids: Vec<String>,
    pub client_id: String,
    pub client_secret: String,
}

/// Configuration problems that abort startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is required (set SKIP_AUTH=true to disable authentication)")]
    MissingAuthVar(&'static str),

    #[error("invalid {key} {value:?}: {source}")]
    InvalidDuration {
        key: &'static str,
        value: String,
        #[source]
        source: DurationParseError,
    },
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| get(key).filter(|value| !value.is_empty());

        let listen_addr = get("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

        let ttl_raw = get("SESSION_TTL").unwrap_or_else(|| DEFAULT_SESSION_TTL.to_string());
        let session_ttl =
            parse_duration(&ttl_raw).map_err(|source| ConfigError::InvalidDuration {
                key: "SESSION_TTL",
                value: ttl_raw.clone(),
                source,
            })?;

        let skip_auth = get("SKIP_AUTH").as_deref() == Some("true");
        let oidc = if skip_auth {
            None
        } else {
            let issuer = get("OIDC_ISSUER").ok_or(ConfigError::MissingAuthVar("OIDC_ISSUER"))?;
            let ids_raw =
                get("OIDC_CLIENT_IDS").ok_or(ConfigError::MissingAuthVar("OIDC_CLIENT_IDS"))?;
            let accepted_client_ids: Vec<String> = ids_raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
            let client_id =
                get("OIDC_CLIENT_ID").ok_or(ConfigError::MissingAuthVar("OIDC_CLIENT_ID"))?;
            let client_secret = get("OIDC_CLIENT_SECRET")
                .ok_or(ConfigError::MissingAuthVar("OIDC_CLIENT_SECRET"))?;

            Some(OidcConfig {
                issuer,
                accepted_client_ids,
                client_id,
                client_secret,
            })
        };

        Ok(Self {
            listen_addr,
            session_ttl,
            oidc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_in_dev_mode() {
        let config = config_from(&[("SKIP_AUTH", "true")]).unwrap();
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert!(config.oidc.is_none());
    }

    #[test]
    fn ttl_and_listen_addr_are_overridable() {
        let config = config_from(&[
            ("SKIP_AUTH", "true"),
            ("LISTEN_ADDR", "127.0.0.1:9000"),
            ("SESSION_TTL", "5m"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.session_ttl, Duration::from_secs(300));
    }

    #[test]
    fn invalid_ttl_is_rejected() {
        let err = config_from(&[("SKIP_AUTH", "true"), ("SESSION_TTL", "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration {
                key: "SESSION_TTL",
                ..
            }
        ));
    }

    #[test]
    fn auth_vars_are_required_without_skip() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAuthVar("OIDC_ISSUER")));

        // Set-but-empty counts as unset.
        let err = config_from(&[("OIDC_ISSUER", "")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAuthVar("OIDC_ISSUER")));
    }

    #[test]
    fn client_ids_split_and_trim() {
        let config = config_from(&[
            ("OIDC_ISSUER", "https://auth.example.com/application/o/tsr/"),
            ("OIDC_CLIENT_IDS", "agent-push, dashboard ,, mobile"),
            ("OIDC_CLIENT_ID", "tsrd"),
            ("OIDC_CLIENT_SECRET", "s3cret"),
        ])
        .unwrap();

        let oidc = config.oidc.unwrap();
        assert_eq!(oidc.accepted_client_ids, ["agent-push", "dashboard", "mobile"]);
        assert_eq!(oidc.client_id, "tsrd");
    }

    #[test]
    fn skip_auth_must_be_exactly_true() {
        let err = config_from(&[("SKIP_AUTH", "1")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAuthVar(_)));
    }
}
