//! Configuration resolution from the process environment.

use std::fmt::Display;
use std::str::FromStr;

use crate::config::schema::{
    LogFormat, ServiceConfig, DEFAULT_MAX_TEXT_LENGTH, DEFAULT_PORT, DEFAULT_RATE_LIMIT_MAX,
    DEFAULT_RATE_LIMIT_WINDOW_MS, DEFAULT_RENDER_TIMEOUT_MS,
};

pub const ENV_RATE_LIMIT_MAX: &str = "RATE_LIMIT_MAX";
pub const ENV_RATE_LIMIT_WINDOW_MS: &str = "RATE_LIMIT_WINDOW_MS";
pub const ENV_MAX_TEXT_LENGTH: &str = "MAX_TEXT_LENGTH";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_RENDER_TIMEOUT_MS: &str = "RENDER_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
pub const ENV_METRICS_ADDRESS: &str = "METRICS_ADDRESS";

/// Resolve the service configuration from the process environment.
pub fn resolve() -> ServiceConfig {
    resolve_with(|key| std::env::var(key).ok())
}

/// Resolve the service configuration from an arbitrary key lookup.
///
/// Missing, blank or unparsable entries fall back to their defaults;
/// numeric settings must also be strictly positive.
pub fn resolve_with<F>(lookup: F) -> ServiceConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ServiceConfig::default();

    config.rate_limit.max_requests =
        positive(&lookup, ENV_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_MAX);
    config.rate_limit.window_ms =
        positive(&lookup, ENV_RATE_LIMIT_WINDOW_MS, DEFAULT_RATE_LIMIT_WINDOW_MS);
    config.max_text_length = positive(&lookup, ENV_MAX_TEXT_LENGTH, DEFAULT_MAX_TEXT_LENGTH);
    config.api_key = non_blank(&lookup, ENV_API_KEY);

    if let Some(host) = non_blank(&lookup, ENV_HOST) {
        config.listener.host = host;
    }
    config.listener.port = positive(&lookup, ENV_PORT, DEFAULT_PORT);
    config.render.timeout_ms =
        positive(&lookup, ENV_RENDER_TIMEOUT_MS, DEFAULT_RENDER_TIMEOUT_MS);

    if let Some(level) = non_blank(&lookup, ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }
    if let Some(format) = non_blank(&lookup, ENV_LOG_FORMAT) {
        config.observability.log_format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "text" | "plain" => LogFormat::Text,
            _ => {
                tracing::warn!(key = ENV_LOG_FORMAT, value = %format, "Unknown log format, using text");
                LogFormat::Text
            }
        };
    }
    config.observability.metrics_address = non_blank(&lookup, ENV_METRICS_ADDRESS);

    config
}

fn non_blank<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default + Display + Copy,
{
    let Some(raw) = non_blank(lookup, key) else {
        return default;
    };

    match raw.parse::<T>() {
        Ok(value) if value > T::default() => value,
        _ => {
            tracing::warn!(key, value = %raw, default = %default, "Invalid setting, using default");
            default
        }
    }
}
