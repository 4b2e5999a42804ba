//! Bearer-token authentication boundary.
//!
//! Every route except `/health` passes through [`require_bearer`],
//! which parses the `Authorization` header, verifies the token through
//! a [`TokenVerifier`], and checks the token audience against the
//! accepted client-ID list. Failures answer `401 {"error": ...}`
//! before any registry access.
//!
//! Token verification itself is an external capability: the production
//! [`OidcVerifier`] asks the OIDC issuer via RFC 7662 token
//! introspection, and tests inject a static verifier through the same
//! trait.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::api::{AppState, ErrorBody};

/// Authentication failures, each rendered as a 401 JSON response.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("invalid authorization header format")]
    MalformedHeader,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token audience not accepted")]
    AudienceNotAccepted,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Claims extracted from a successfully verified token.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub subject: String,
    pub email: Option<String>,
    pub audiences: Vec<String>,
}

/// The caller identity the middleware attaches to accepted requests.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub subject: String,
    pub email: Option<String>,
}

/// Verifies a raw bearer token and returns its claims.
///
/// This seam exists so tests can substitute a static verifier for the
/// OIDC-backed one.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError>;
}

/// Verifier plus the audience policy applied after verification.
pub struct AuthContext {
    pub verifier: Arc<dyn TokenVerifier>,
    pub accepted_client_ids: Vec<String>,
}

impl AuthContext {
    /// True when at least one token audience matches an accepted
    /// client ID.
    pub fn audience_accepted(&self, audiences: &[String]) -> bool {
        audiences
            .iter()
            .any(|aud| self.accepted_client_ids.iter().any(|id| id == aud))
    }
}

/// Middleware enforcing bearer authentication on protected routes.
///
/// When the state carries no auth context (dev mode), requests pass
/// straight through.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(auth) = state.auth.clone() else {
        return Ok(next.run(request).await);
    };

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let (scheme, token) = header.split_once(' ').ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    let verified = auth.verifier.verify(token).await?;

    if !auth.audience_accepted(&verified.audiences) {
        debug!(audiences = ?verified.audiences, "token audience rejected");
        return Err(AuthError::AudienceNotAccepted);
    }

    request.extensions_mut().insert(CallerIdentity {
        subject: verified.subject,
        email: verified.email,
    });

    Ok(next.run(request).await)
}

/// The JWT/introspection `aud` claim: a single string or an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audience(pub Vec<String>);

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(value) => Audience(vec![value]),
            OneOrMany::Many(values) => Audience(values),
        })
    }
}

/// Failures while setting up the OIDC verifier at startup.
#[derive(Error, Debug)]
pub enum AuthSetupError {
    #[error("OIDC discovery failed: {0}")]
    Discovery(#[from] reqwest::Error),

    #[error("issuer does not advertise a token introspection endpoint")]
    NoIntrospectionEndpoint,
}

/// The subset of the OIDC discovery document this daemon needs.
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    #[serde(default)]
    introspection_endpoint: Option<String>,
}

/// What the introspection endpoint reports about a token.
#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    active: bool,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
}

/// Token verifier backed by the issuer's introspection endpoint.
pub struct OidcVerifier {
    http: reqwest::Client,
    introspection_endpoint: String,
    client_id: String,
    client_secret: String,
}

impl OidcVerifier {
    /// Performs OIDC discovery against the issuer and returns a
    /// verifier bound to its introspection endpoint.
    pub async fn discover(
        issuer: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self, AuthSetupError> {
        let http = reqwest::Client::new();
        let url = format!(
            "{}/.well-known/openid-configuration",
            issuer.trim_end_matches('/')
        );

        let document: DiscoveryDocument = http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let introspection_endpoint = document
            .introspection_endpoint
            .ok_or(AuthSetupError::NoIntrospectionEndpoint)?;

        Ok(Self {
            http,
            introspection_endpoint,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }
}

#[async_trait]
impl TokenVerifier for OidcVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let response = self
            .http
            .post(&self.introspection_endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let introspection: IntrospectionResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if !introspection.active {
            return Err(AuthError::InvalidToken("token is not active".to_string()));
        }

        Ok(VerifiedToken {
            subject: introspection.sub.unwrap_or_default(),
            email: introspection.email,
            audiences: introspection.aud.map(|aud| aud.0).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(accepted: &[&str]) -> AuthContext {
        struct NoopVerifier;

        #[async_trait]
        impl TokenVerifier for NoopVerifier {
            async fn verify(&self, _token: &str) -> Result<VerifiedToken, AuthError> {
                Err(AuthError::InvalidToken("unused".to_string()))
            }
        }

        AuthContext {
            verifier: Arc::new(NoopVerifier),
            accepted_client_ids: accepted.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn audience_accepted_on_any_overlap() {
        let ctx = context(&["app-1", "app-2"]);
        assert!(ctx.audience_accepted(&["app-2".to_string()]));
        assert!(ctx.audience_accepted(&["other".to_string(), "app-1".to_string()]));
    }

    #[test]
    fn audience_rejected_without_overlap() {
        let ctx = context(&["app-1"]);
        assert!(!ctx.audience_accepted(&[]));
        assert!(!ctx.audience_accepted(&["app-2".to_string()]));

        let empty = context(&[]);
        assert!(!empty.audience_accepted(&["app-1".to_string()]));
    }

    #[test]
    fn audience_deserializes_from_string() {
        let aud: Audience = serde_json::from_str(r#""single-client""#).unwrap();
        assert_eq!(aud, Audience(vec!["single-client".to_string()]));
    }

    #[test]
    fn audience_deserializes_from_array() {
        let aud: Audience = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(aud, Audience(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn audience_rejects_other_shapes() {
        assert!(serde_json::from_str::<Audience>("42").is_err());
        assert!(serde_json::from_str::<Audience>(r#"{"aud": "x"}"#).is_err());
    }

    #[test]
    fn introspection_response_defaults() {
        let resp: IntrospectionResponse = serde_json::from_str(r#"{"active": false}"#).unwrap();
        assert!(!resp.active);
        assert!(resp.sub.is_none());
        assert!(resp.aud.is_none());
    }
}
