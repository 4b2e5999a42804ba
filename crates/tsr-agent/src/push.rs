//! HTTP push client for the registry daemon.

use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::warn;

use tsr_core::PushRequest;

use crate::oidc::{TokenError, TokenSource};

/// Failures while delivering one push.
#[derive(Error, Debug)]
pub enum PushError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("push request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("push failed: 401 unauthorized")]
    Unauthorized,

    #[error("push failed: server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("push failed: unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// Sends session inventories to the daemon's push endpoint.
pub struct Pusher {
    http: reqwest::Client,
    server_url: String,

    /// `None` when running without authentication (dev mode).
    tokens: Option<Arc<TokenSource>>,
}

impl Pusher {
    /// Creates a pusher for `{server_url}/api/sessions`.
    pub fn new(server_url: impl Into<String>, tokens: Option<Arc<TokenSource>>) -> Self {
        let server_url: String = server_url.into();
        Self {
            http: reqwest::Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// POSTs one push request, expecting `204 No Content`.
    pub async fn push(&self, req: &PushRequest) -> Result<(), PushError> {
        let mut request = self
            .http
            .post(format!("{}/api/sessions", self.server_url))
            .json(req);

        if let Some(tokens) = &self.tokens {
            request = request.bearer_auth(tokens.access_token().await?);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::UNAUTHORIZED => {
                warn!("authentication failed, check OIDC credentials");
                Err(PushError::Unauthorized)
            }
            status if status.is_server_error() => {
                let body = response.text().await.unwrap_or_default();
                Err(PushError::Server {
                    status: status.as_u16(),
                    body,
                })
            }
            status => Err(PushError::UnexpectedStatus(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::Router;
    use chrono::Utc;

    use tsr_core::TmuxSession;

    fn request() -> PushRequest {
        PushRequest {
            machine_name: "laptop".to_string(),
            ssh_host: "192.168.1.100".to_string(),
            ssh_user: "dev".to_string(),
            sessions: vec![TmuxSession {
                name: "main".to_string(),
                windows: 5,
                window_details: Vec::new(),
                attached: true,
                last_activity: Utc::now(),
            }],
        }
    }

    /// Serves a push endpoint that answers with a fixed status and
    /// records the Authorization header it saw.
    async fn spawn_server(
        status: u16,
        body: &'static str,
        seen_auth: Arc<Mutex<Option<String>>>,
    ) -> String {
        let handler = move |headers: HeaderMap| {
            let seen_auth = seen_auth.clone();
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string());
                if let Ok(mut slot) = seen_auth.lock() {
                    *slot = auth;
                }
                (axum::http::StatusCode::from_u16(status).unwrap_or_default(), body)
            }
        };

        let app = Router::new().route("/api/sessions", post(handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn push_succeeds_on_no_content() {
        let seen = Arc::new(Mutex::new(None));
        let url = spawn_server(204, "", seen.clone()).await;

        let pusher = Pusher::new(url, None);
        pusher.push(&request()).await.unwrap();

        // No token source, no Authorization header.
        assert!(seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn push_maps_unauthorized() {
        let seen = Arc::new(Mutex::new(None));
        let url = spawn_server(401, r#"{"error":"invalid token"}"#, seen).await;

        let result = Pusher::new(url, None).push(&request()).await;
        assert!(matches!(result, Err(PushError::Unauthorized)));
    }

    #[tokio::test]
    async fn push_maps_server_errors_with_body() {
        let seen = Arc::new(Mutex::new(None));
        let url = spawn_server(503, "registry overloaded", seen).await;

        let result = Pusher::new(url, None).push(&request()).await;
        match result {
            Err(PushError::Server { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "registry overloaded");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn push_maps_unexpected_statuses() {
        let seen = Arc::new(Mutex::new(None));
        let url = spawn_server(200, "", seen).await;

        let result = Pusher::new(url, None).push(&request()).await;
        assert!(matches!(result, Err(PushError::UnexpectedStatus(200))));
    }

    #[tokio::test]
    async fn push_attaches_bearer_token() {
        let seen = Arc::new(Mutex::new(None));
        let url = spawn_server(204, "", seen.clone()).await;

        // Token endpoint served by a second loopback server.
        let issuer_requests = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let token_url = {
            use axum::Json;
            use serde_json::json;

            let requests = issuer_requests.clone();
            let handler = move || {
                let requests = requests.clone();
                async move {
                    requests.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Json(json!({"access_token": "push-token", "expires_in": 3600}))
                }
            };
            let app = Router::new().route("/token", post(handler));
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{addr}/token")
        };

        let tokens = Arc::new(TokenSource::new(token_url, "agent", "secret"));
        let pusher = Pusher::new(url, Some(tokens));
        pusher.push(&request()).await.unwrap();

        assert_eq!(
            seen.lock().unwrap().as_deref(),
            Some("Bearer push-token"),
            "push should carry the issued token"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let pusher = Pusher::new("http://127.0.0.1:9", None);
        let result = pusher.push(&request()).await;
        assert!(matches!(result, Err(PushError::Transport(_))));
    }
}
