//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! Every field has a named default so a bare environment yields a working
//! server.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 15 * 60 * 1000;
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 2000;
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 10_000;

/// Request bodies above this many bytes are rejected as unparsable.
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// Root configuration for the QR code service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Per-client request throttling.
    pub rate_limit: RateLimitConfig,

    /// Maximum accepted text length, in characters.
    pub max_text_length: usize,

    /// Optional API key. When set, `/qr` requires it.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// QR rendering settings.
    pub render: RenderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            api_key: None,
            render: RenderConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn auth_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListenerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per client per window.
    pub max_requests: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window_ms: DEFAULT_RATE_LIMIT_WINDOW_MS,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// QR rendering configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    /// Deadline for a single render in milliseconds.
    pub timeout_ms: u64,

    /// Minimum output width in pixels.
    pub width: u32,

    /// Quiet zone around the symbol, in modules.
    pub margin: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
            width: 256,
            margin: 2,
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter directive, used when RUST_LOG is unset.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Prometheus scrape address. Metrics export is off when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "qr_code_api=info,tower_http=info".to_string(),
            log_format: LogFormat::Text,
            metrics_address: None,
        }
    }
}
