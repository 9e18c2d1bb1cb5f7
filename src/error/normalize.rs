//! Failure normalization.
//!
//! Maps every failure that can leave a pipeline stage onto the one
//! [`AppError`] the caller sees. Rules are checked in this order, first
//! match wins:
//!
//! 1. typed [`AppError`] → as is
//! 2. malformed input syntax → 400 `PARSE_ERROR`
//! 3. carried status of exactly 400 → 400 `PARSE_ERROR`
//! 4. recognized network fault → 503 `NETWORK_ERROR`
//! 5. carried status in 400..=599 → that status, message/code/details kept
//! 6. message mentions length, "too long" or overflow → 400 `INVALID_TEXT`
//! 7. anything else → 500 `INTERNAL_ERROR`, cause logged only

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::error::app::{AppError, ErrorCode};

/// Transport-level fault categories that map to `NETWORK_ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFault {
    ConnectionReset,
    TimedOut,
    HostNotFound,
    ConnectionRefused,
    NetworkUnreachable,
    DnsRetryExhausted,
}

impl NetworkFault {
    /// Recognize an errno-style code such as `ECONNRESET`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ECONNRESET" => Some(Self::ConnectionReset),
            "ETIMEDOUT" => Some(Self::TimedOut),
            "ENOTFOUND" => Some(Self::HostNotFound),
            "ECONNREFUSED" => Some(Self::ConnectionRefused),
            "ENETUNREACH" => Some(Self::NetworkUnreachable),
            "EAI_AGAIN" => Some(Self::DnsRetryExhausted),
            _ => None,
        }
    }

    pub fn from_io_kind(kind: std::io::ErrorKind) -> Option<Self> {
        use std::io::ErrorKind;
        match kind {
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                Some(Self::ConnectionReset)
            }
            ErrorKind::TimedOut => Some(Self::TimedOut),
            ErrorKind::ConnectionRefused => Some(Self::ConnectionRefused),
            ErrorKind::NetworkUnreachable | ErrorKind::HostUnreachable => {
                Some(Self::NetworkUnreachable)
            }
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::ConnectionReset => "ECONNRESET",
            Self::TimedOut => "ETIMEDOUT",
            Self::HostNotFound => "ENOTFOUND",
            Self::ConnectionRefused => "ECONNREFUSED",
            Self::NetworkUnreachable => "ENETUNREACH",
            Self::DnsRetryExhausted => "EAI_AGAIN",
        }
    }
}

/// A failure from outside the pipeline, translated at the call boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UntypedError {
    pub message: String,
    pub status: Option<u16>,
    pub code: Option<String>,
    pub details: Option<Value>,
    /// Input could not be parsed at all (JSON syntax, query encoding).
    pub syntax: bool,
    pub network: Option<NetworkFault>,
}

impl UntypedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self {
            syntax: true,
            ..Self::new(message)
        }
    }

    pub fn network(fault: NetworkFault, message: impl Into<String>) -> Self {
        Self {
            network: Some(fault),
            code: Some(fault.as_code().to_string()),
            ..Self::new(message)
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach a code; errno-style network codes are recognized.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        if self.network.is_none() {
            self.network = NetworkFault::from_code(&code);
        }
        self.code = Some(code);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for UntypedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<std::io::Error> for UntypedError {
    fn from(err: std::io::Error) -> Self {
        match NetworkFault::from_io_kind(err.kind()) {
            Some(fault) => Self::network(fault, err.to_string()),
            None => Self::new(err.to_string()),
        }
    }
}

/// Everything a pipeline stage can fail with.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    App(AppError),
    Untyped(UntypedError),
}

impl From<AppError> for Failure {
    fn from(err: AppError) -> Self {
        Failure::App(err)
    }
}

impl From<UntypedError> for Failure {
    fn from(err: UntypedError) -> Self {
        Failure::Untyped(err)
    }
}

impl From<std::io::Error> for Failure {
    fn from(err: std::io::Error) -> Self {
        Failure::Untyped(err.into())
    }
}

impl From<QueryRejection> for Failure {
    fn from(rejection: QueryRejection) -> Self {
        Failure::Untyped(UntypedError::syntax(rejection.body_text()))
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Failure::Untyped(UntypedError::syntax(err.to_string()))
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        normalize(self).into_response()
    }
}

/// Convert a failure into the error returned to the caller.
pub fn normalize(failure: Failure) -> AppError {
    let err = match failure {
        Failure::App(err) => return err,
        Failure::Untyped(err) => err,
    };

    if err.syntax {
        let mut parsed = AppError::new(
            StatusCode::BAD_REQUEST,
            "Invalid JSON in request body. Check that your body is valid JSON.",
        )
        .with_code(ErrorCode::ParseError);
        if !err.message.is_empty() {
            parsed = parsed.with_details(Value::String(err.message));
        }
        return parsed;
    }

    if err.status == Some(400) {
        return AppError::new(
            StatusCode::BAD_REQUEST,
            "Invalid request body. Ensure the body is valid JSON.",
        )
        .with_code(ErrorCode::ParseError);
    }

    if let Some(fault) = err.network {
        tracing::warn!(fault = fault.as_code(), error = %err.message, "Network failure");
        return AppError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable. Please try again later.",
        )
        .with_code(ErrorCode::NetworkError);
    }

    if let Some(status) = err
        .status
        .filter(|s| (400..600).contains(s))
        .and_then(|s| StatusCode::from_u16(s).ok())
    {
        let message = if err.message.is_empty() {
            "Request failed".to_string()
        } else {
            err.message
        };
        let mut passed = AppError::new(status, message).with_raw_code(err.code);
        if let Some(details) = err.details {
            passed = passed.with_details(details);
        }
        return passed;
    }

    let lowered = err.message.to_lowercase();
    if lowered.contains("length") || lowered.contains("too long") || lowered.contains("overflow")
    {
        return AppError::new(
            StatusCode::BAD_REQUEST,
            "The provided text is too long or invalid for a QR code. Use shorter text.",
        )
        .with_code(ErrorCode::InvalidText);
    }

    tracing::error!(error = %err.message, code = ?err.code, "Unhandled error");
    AppError::internal()
}
