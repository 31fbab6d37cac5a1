//! Authentication + rate-limit middleware (spec §4.8, §5).
//!
//! A single pre-shared key is presented in the `X-API-Key` header on every
//! request. Missing or mismatched keys are `UNAUTHORIZED`; once the key
//! checks out, the request is charged against that key's rate-limit
//! bucket (keyed by the key's SHA-256 hash, never the raw value).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";

pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if presented.is_empty() || !state.api_key_matches(presented) {
        return Err(AppError::Unauthorized);
    }

    let key_hash = AppState::hash_credential(presented);
    if !state.check_rate_limit(&key_hash) {
        return Err(AppError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}
