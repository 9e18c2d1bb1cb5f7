//! QR code endpoints.
//!
//! Both transports run the same pipeline once the API key and rate limit
//! layers have admitted the request:
//!
//! ```text
//! extract text field → validate → render (blocking, with deadline) → PNG
//! ```
//!
//! Any stage may fail with a [`Failure`], which the normalizer turns into
//! the JSON error response.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, Request},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;

use crate::config::schema::MAX_BODY_BYTES;
use crate::error::{Failure, UntypedError};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::timeouts::blocking_with_deadline;
use crate::security::limits::read_limited_body;
use crate::validation::{validate_field, TextField, Transport};

pub const CACHE_CONTROL_VALUE: &str = "public, max-age=86400";

#[derive(Debug, Deserialize)]
pub struct QrQuery {
    pub text: Option<String>,
}

/// `GET /qr?text=...`
pub async fn get_qr(
    State(state): State<AppState>,
    query: Result<Query<QrQuery>, QueryRejection>,
) -> Result<Response, Failure> {
    let Query(query) = query?;
    let text = validate_field(
        TextField::from_query(query.text),
        state.config.max_text_length,
        Transport::Query,
    )?;
    render_png(&state, text).await
}

/// `POST /qr` with a JSON body `{"text": "..."}`.
pub async fn post_qr(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, Failure> {
    let (parts, body) = request.into_parts();
    let bytes = read_limited_body(body, MAX_BODY_BYTES).await?;

    // Bodies of other media types are not parsed, leaving the field absent.
    let field = if is_json(&parts.headers) && !bytes.is_empty() {
        let body: Value = serde_json::from_slice(&bytes)?;
        TextField::from_json(&body)
    } else {
        TextField::Absent
    };

    let text = validate_field(field, state.config.max_text_length, Transport::Body)?;
    render_png(&state, text).await
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

async fn render_png(state: &AppState, text: String) -> Result<Response, Failure> {
    let renderer = Arc::clone(&state.renderer);
    let content_type = renderer.content_type();
    let start = Instant::now();

    let rendered =
        blocking_with_deadline(state.config.render.timeout(), move || renderer.render(&text))
            .await;

    let png = match rendered {
        Ok(Ok(png)) => {
            metrics::record_render("ok", start);
            png
        }
        Ok(Err(e)) => {
            metrics::record_render("error", start);
            tracing::debug!(error = %e, "Render failed");
            return Err(UntypedError::from(e).into());
        }
        Err(failure) => {
            metrics::record_render("aborted", start);
            return Err(failure);
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, CACHE_CONTROL_VALUE),
        ],
        png,
    )
        .into_response())
}
