//! The typed application error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Closed taxonomy of error codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    MissingText,
    Unauthorized,
    RateLimitExceeded,
    ParseError,
    NetworkError,
    InvalidText,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::MissingText => "MISSING_TEXT",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::InvalidText => "INVALID_TEXT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error with an HTTP status.
///
/// Immutable once built. The status is always a client or server error;
/// anything else is coerced to 500.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    message: String,
    status: StatusCode,
    code: Option<String>,
    details: Option<Value>,
}

/// Wire shape of every non-2xx response.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let status = if status.is_client_error() || status.is_server_error() {
            status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            message: message.into(),
            status,
            code: None,
            details: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code.as_str().to_string());
        self
    }

    /// Attach a code that is not part of [`ErrorCode`], as carried by
    /// untyped errors passing through the normalizer.
    pub fn with_raw_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Invalid or missing API key. Provide X-API-Key header or apiKey query.",
        )
        .with_code(ErrorCode::Unauthorized)
    }

    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.",
        )
        .with_code(ErrorCode::RateLimitExceeded)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found").with_code(ErrorCode::NotFound)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An unexpected error occurred. Please try again later.",
        )
        .with_code(ErrorCode::InternalError)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            code: self.code.as_deref(),
            details: self.details.as_ref(),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_non_error_status_is_coerced() {
        let err = AppError::new(StatusCode::OK, "fine");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = AppError::new(StatusCode::BAD_REQUEST, "bad");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_code_serialization() {
        assert_eq!(
            serde_json::to_value(ErrorCode::RateLimitExceeded).unwrap(),
            json!("RATE_LIMIT_EXCEEDED")
        );
        assert_eq!(ErrorCode::MissingText.to_string(), "MISSING_TEXT");
    }

    #[tokio::test]
    async fn test_response_shape() {
        let err = AppError::new(StatusCode::BAD_REQUEST, "Invalid text")
            .with_code(ErrorCode::ValidationError)
            .with_details(json!([{ "field": "text", "message": "text is required" }]));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({
                "error": "Invalid text",
                "code": "VALIDATION_ERROR",
                "details": [{ "field": "text", "message": "text is required" }]
            })
        );
    }

    #[tokio::test]
    async fn test_optional_fields_omitted() {
        let response = AppError::new(StatusCode::CONFLICT, "busy").into_response();
        assert_eq!(body_json(response).await, json!({ "error": "busy" }));
    }
}
