//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming /qr request:
//!     → api_key.rs (optional API key gate)
//!     → rate_limit.rs (per-IP fixed window, headers on every response)
//!     → limits.rs (body size cap while reading)
//!     → Pass to the QR pipeline
//!
//! Every response:
//!     → headers.rs (security headers)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a configured key must match exactly after trimming
//! - Rate limit state lives in one limiter instance owned by the server
//! - Counters are per process; multiple instances do not share them
//! - API key values are never logged

pub mod api_key;
pub mod headers;
pub mod limits;
pub mod rate_limit;
