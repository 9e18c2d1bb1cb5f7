//! Health check and usage endpoints. Neither is authenticated or throttled.

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::http::server::AppState;

pub const SERVICE_NAME: &str = "qr-code-api";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub service: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        service: SERVICE_NAME,
    })
}

pub async fn usage() -> Json<Value> {
    Json(json!({
        "name": "QR Code API",
        "usage": {
            "get": "GET /qr?text=https://example.com",
            "post": "POST /qr with body { \"text\": \"https://example.com\" }",
        },
        "health": "GET /health",
    }))
}
