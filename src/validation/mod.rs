//! Input validation for the `text` field.
//!
//! # Data Flow
//! ```text
//! query ?text=...  ─┐
//!                   ├→ TextField (Absent | Present | NotString)
//! JSON {"text":..} ─┘
//!     → Absent            → MISSING_TEXT
//!     → Present(raw)      → validate(raw, max) → trimmed text | VALIDATION_ERROR
//!     → NotString         → VALIDATION_ERROR
//! ```
//!
//! # Design Decisions
//! - An absent field and an invalid field are different types, so the
//!   error code never depends on check order
//! - All violations are collected, none short-circuit
//! - Length is counted in characters, after trimming

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, ErrorCode};

pub const TEXT_FIELD: &str = "text";

/// Where the text came from. Only affects error wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Query,
    Body,
}

/// The `text` field as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextField {
    Absent,
    Present(String),
    /// Present in a JSON body, but not a string.
    NotString,
}

impl TextField {
    pub fn from_query(text: Option<String>) -> Self {
        match text {
            Some(text) => TextField::Present(text),
            None => TextField::Absent,
        }
    }

    /// Read `text` from a parsed JSON body. `null` counts as absent.
    pub fn from_json(body: &Value) -> Self {
        match body.get(TEXT_FIELD) {
            None | Some(Value::Null) => TextField::Absent,
            Some(Value::String(text)) => TextField::Present(text.clone()),
            Some(_) => TextField::NotString,
        }
    }
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

impl Violation {
    fn text(message: impl Into<String>) -> Self {
        Self {
            field: TEXT_FIELD,
            message: message.into(),
        }
    }
}

/// Check raw text against the rules. Returns the trimmed text.
pub fn validate(raw: &str, max_length: usize) -> Result<String, Vec<Violation>> {
    let trimmed = raw.trim();
    let mut violations = Vec::new();

    if trimmed.is_empty() {
        violations.push(Violation::text("text is required"));
    }
    if trimmed.chars().count() > max_length {
        violations.push(Violation::text(format!(
            "text must be at most {max_length} characters"
        )));
    }

    if violations.is_empty() {
        Ok(trimmed.to_string())
    } else {
        Err(violations)
    }
}

/// Resolve a supplied field into validated text or the error to report.
pub fn validate_field(
    field: TextField,
    max_length: usize,
    transport: Transport,
) -> Result<String, AppError> {
    let outcome = match field {
        TextField::Absent => return Err(missing_text(transport)),
        TextField::Present(raw) => validate(&raw, max_length),
        TextField::NotString => Err(vec![Violation::text("text must be a string")]),
    };
    outcome.map_err(|violations| invalid_text(transport, &violations))
}

fn missing_text(transport: Transport) -> AppError {
    let message = match transport {
        Transport::Query => {
            "Missing required parameter: \"text\". Use ?text=your-link-or-message"
        }
        Transport::Body => {
            "Missing required field: \"text\". Send a JSON body: { \"text\": \"your-link-or-message\" }"
        }
    };
    AppError::new(StatusCode::BAD_REQUEST, message).with_code(ErrorCode::MissingText)
}

fn invalid_text(transport: Transport, violations: &[Violation]) -> AppError {
    let message = match transport {
        Transport::Query => "Invalid text: check the \"text\" query parameter.",
        Transport::Body => "Invalid text in request body.",
    };
    let details = serde_json::to_value(violations).unwrap_or(Value::Null);
    AppError::new(StatusCode::BAD_REQUEST, message)
        .with_code(ErrorCode::ValidationError)
        .with_details(details)
}
