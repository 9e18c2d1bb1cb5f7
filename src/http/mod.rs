//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers, routing)
//!     → request.rs (request ID, request span)
//!     → /health, /      → health.rs
//!     → /qr             → API key gate → rate limiter → qr.rs
//!     → anything else   → 404 NOT_FOUND
//!     → errors          → error::normalize → JSON error body
//! ```

pub mod health;
pub mod qr;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
