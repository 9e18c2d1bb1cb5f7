//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (RATE_LIMIT_MAX, API_KEY, PORT, ...)
//!     → loader.rs (lookup, parse, fall back to defaults)
//!     → ServiceConfig (resolved once, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Resolution never fails; bad input degrades to the named default
//! - No subsystem reads the environment directly
//! - The API key is never serialized or logged

pub mod loader;
pub mod schema;

pub use loader::{resolve, resolve_with};
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::RateLimitConfig;
pub use schema::RenderConfig;
pub use schema::ServiceConfig;
