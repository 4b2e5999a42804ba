//! HTTP API on top of the registry.
//!
//! Three routes: an unauthenticated health probe, and the
//! authenticated push/pull pair under `/api/sessions`. The push body
//! is decoded by hand from the raw bytes so malformed JSON produces
//! the contract's `{"error": "invalid request body: ..."}` shape
//! rather than a framework rejection.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use tsr_core::{PushRequest, SessionsResponse, ValidationError};

use crate::auth::{self, AuthContext};
use crate::registry::Registry;

/// Shared state handed to every handler and the auth middleware.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,

    /// `None` disables authentication (dev mode).
    pub auth: Option<Arc<AuthContext>>,
}

/// JSON error body used by every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Rejections produced at the API boundary, all answered with 400.
///
/// These never reach the registry: a rejected push mutates nothing.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Builds the full application router.
///
/// `/health` sits outside the auth layer; everything under `/api` is
/// behind it.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/sessions", get(get_sessions).post(post_sessions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Pull: a point-in-time snapshot of all live machines.
///
/// The list is empty (never null) both before any push and after all
/// entries have expired; the two cases are indistinguishable.
async fn get_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        machines: state.registry.snapshot(),
    })
}

/// Push: full replacement of one machine's inventory.
async fn post_sessions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let req: PushRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;

    req.validate()?;

    debug!(machine = %req.machine_name, sessions = req.sessions.len(), "push accepted");
    state.registry.update(req);

    Ok(StatusCode::NO_CONTENT)
}
