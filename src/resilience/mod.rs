//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! QR render:
//!     → timeouts.rs (deadline around the blocking render)
//!     → On expiry: TimedOut network fault → 503 NETWORK_ERROR
//! ```
//!
//! # Design Decisions
//! - Every call outside the async pipeline has a deadline
//! - No retries: failures surface to the caller immediately

pub mod timeouts;
