//! Error model.
//!
//! # Data Flow
//! ```text
//! Any pipeline stage
//!     → AppError (typed, already shaped for the caller)
//!     → or UntypedError (translated at the boundary of an external call)
//!     → Failure
//!     → normalize.rs (fixed precedence)
//!     → AppError → JSON error response
//! ```
//!
//! # Design Decisions
//! - One typed error reaches the caller; its shape is `{error, code?, details?}`
//! - External failures are translated where they occur, never inspected later
//! - Internal causes are logged server-side only

pub mod app;
pub mod normalize;

pub use app::{AppError, ErrorCode};
pub use normalize::{normalize, Failure, NetworkFault, UntypedError};
