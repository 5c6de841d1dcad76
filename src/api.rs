use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::auth::AuthVerdict;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::transport::{authenticate_add, authenticate_echo, BindingError, CallAttributes};
use crate::types::*;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/echo", post(echo))
        .route("/add", post(add))
        .with_state(state)
}

// ============ Auth Helpers ============

/// Auth attributes from the request headers; `None` when the call carries none
fn call_attributes(headers: &HeaderMap) -> Option<CallAttributes> {
    let attrs = CallAttributes::from_pairs(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    );
    (!attrs.is_empty()).then_some(attrs)
}

fn authenticated(state: &AppState, call: &str, verdict: Result<AuthVerdict, BindingError>) -> ApiResult<()> {
    let verdict = verdict.map_err(|e| match e {
        BindingError::Canonical(e) => ApiError::bad_request(e.to_string()),
        BindingError::KeyStore(e) => ApiError::internal(e.to_string()),
    })?;

    require_authenticated(call, verdict).inspect_err(|_| state.record_rejected())
}

/// Gate a handler on a verdict
///
/// Every failing verdict becomes the same [`ApiError::Unauthenticated`];
/// which check failed only reaches the log.
fn require_authenticated(call: &str, verdict: AuthVerdict) -> ApiResult<()> {
    if verdict.is_authenticated() {
        return Ok(());
    }
    tracing::warn!(call, verdict = %verdict, "Rejected unauthenticated call");
    Err(ApiError::Unauthenticated)
}

// ============ Health ============

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::success(state.health()))
}

// ============ Calls ============

async fn echo(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EchoRequest>,
) -> ApiResult<impl IntoResponse> {
    authenticated(&state, "echo", authenticate_echo(state.keys.as_ref(), &req))?;

    state.stats.echo_handled.fetch_add(1, Ordering::Relaxed);
    Ok(Json(ApiResponse::success(EchoReply {
        message: format!("Echo {}", req.message),
    })))
}

async fn add(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AddRequest>,
) -> ApiResult<impl IntoResponse> {
    let attributes = call_attributes(&headers);
    authenticated(
        &state,
        "add",
        authenticate_add(state.keys.as_ref(), &req, attributes.as_ref()),
    )?;

    let result = req.a + req.b;
    if !result.is_finite() {
        return Err(ApiError::bad_request("Sum is not a finite number"));
    }

    state.stats.add_handled.fetch_add(1, Ordering::Relaxed);
    Ok(Json(ApiResponse::success(AddReply { result })))
}
