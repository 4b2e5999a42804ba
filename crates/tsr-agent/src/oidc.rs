//! OIDC client-credentials token source.
//!
//! The agent authenticates to the daemon with bearer tokens obtained
//! via the client-credentials grant. The token endpoint comes from
//! OIDC discovery; tokens are cached and refreshed shortly before
//! they expire so the push loop almost never waits on the issuer.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Refresh this many seconds before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// Failures while obtaining an access token.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("OIDC discovery failed: {0}")]
    Discovery(#[source] reqwest::Error),

    #[error("token request failed: {0}")]
    Request(#[source] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    token_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    60
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Fetches and caches client-credentials access tokens.
pub struct TokenSource {
    http: reqwest::Client,
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    /// Creates a token source against a known token endpoint.
    pub fn new(
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_endpoint: token_endpoint.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached: Mutex::new(None),
        }
    }

    /// Performs OIDC discovery against the issuer and returns a token
    /// source bound to its token endpoint.
    pub async fn discover(
        issuer: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self, TokenError> {
        let http = reqwest::Client::new();
        let url = format!(
            "{}/.well-known/openid-configuration",
            issuer.trim_end_matches('/')
        );

        let document: DiscoveryDocument = http
            .get(&url)
            .send()
            .await
            .map_err(TokenError::Discovery)?
            .error_for_status()
            .map_err(TokenError::Discovery)?
            .json()
            .await
            .map_err(TokenError::Discovery)?;

        Ok(Self {
            http,
            token_endpoint: document.token_endpoint,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            cached: Mutex::new(None),
        })
    }

    /// Returns a valid access token, refreshing it when the cached one
    /// is absent or about to expire.
    pub async fn access_token(&self) -> Result<String, TokenError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Utc::now() + TimeDelta::seconds(EXPIRY_MARGIN_SECS) < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        let response: TokenResponse = self
            .http
            .post(&self.token_endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", "openid"),
            ])
            .send()
            .await
            .map_err(TokenError::Request)?
            .error_for_status()
            .map_err(TokenError::Request)?
            .json()
            .await
            .map_err(TokenError::Request)?;

        debug!(expires_in = response.expires_in, "obtained access token");

        *cached = Some(CachedToken {
            access_token: response.access_token.clone(),
            expires_at: Utc::now() + TimeDelta::seconds(response.expires_in),
        });

        Ok(response.access_token)
    }
}
