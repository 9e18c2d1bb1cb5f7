//! Optional API key gate.
//!
//! When no key is configured every request is allowed. Otherwise the caller
//! must present the key in the `X-API-Key` header or the `apiKey` query
//! parameter; the header wins when both are present.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, Failure};
use crate::http::server::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_QUERY: &str = "apiKey";

/// Outcome of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Reject,
}

/// Decide whether a request carrying `provided` may pass.
pub fn authenticate(provided: Option<&str>, configured: Option<&str>) -> AuthDecision {
    let Some(expected) = configured else {
        return AuthDecision::Allow;
    };

    match provided.map(str::trim) {
        Some(candidate) if candidate == expected => AuthDecision::Allow,
        _ => AuthDecision::Reject,
    }
}

/// Pull the candidate key out of the request. Blank values don't count.
pub fn extract_api_key(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    let from_header = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(key) = from_header {
        return Some(key.to_string());
    }

    query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(name, _)| name == API_KEY_QUERY)
            .map(|(_, value)| value.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, Failure> {
    let configured = state.config.api_key.as_deref();
    if configured.is_none() {
        return Ok(next.run(request).await);
    }

    let provided = extract_api_key(request.headers(), request.uri().query());
    match authenticate(provided.as_deref(), configured) {
        AuthDecision::Allow => Ok(next.run(request).await),
        AuthDecision::Reject => {
            tracing::warn!(
                path = %request.uri().path(),
                key_present = provided.is_some(),
                "Rejected request with invalid API key"
            );
            Err(AppError::unauthorized().into())
        }
    }
}
