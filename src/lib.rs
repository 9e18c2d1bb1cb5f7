//! QR code HTTP service library.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod render;
pub mod resilience;
pub mod security;
pub mod validation;

pub use config::ServiceConfig;
pub use error::{AppError, Failure};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
