//! Timeout enforcement.
//!
//! # Responsibilities
//! - Run blocking work on the blocking pool with a deadline
//! - Report expiry as a distinct, network-class failure
//!
//! The blocking task is not cancelled when the deadline passes; it runs to
//! completion and its result is discarded.

use std::future::Future;
use std::time::Duration;

use crate::error::{Failure, NetworkFault, UntypedError};

/// Await `future`, failing with a `TimedOut` fault after `deadline`.
pub async fn with_deadline<F, T>(deadline: Duration, future: F) -> Result<T, Failure>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, future).await.map_err(|_| {
        Failure::from(UntypedError::network(
            NetworkFault::TimedOut,
            format!("operation exceeded deadline of {deadline:?}"),
        ))
    })
}

/// Run a blocking closure off the runtime, bounded by `deadline`.
pub async fn blocking_with_deadline<F, T>(deadline: Duration, f: F) -> Result<T, Failure>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let joined = with_deadline(deadline, tokio::task::spawn_blocking(f)).await?;
    joined.map_err(|e| Failure::from(UntypedError::new(format!("blocking task failed: {e}"))))
}
