//! Request size limits.
//!
//! Bodies are buffered up to a fixed cap. A body that exceeds the cap or
//! cannot be read is reported as unparsable input, the same as malformed
//! JSON.

use axum::body::{Body, Bytes};

use crate::error::{Failure, UntypedError};

/// Buffer a request body, failing once it grows past `limit` bytes.
pub async fn read_limited_body(body: Body, limit: usize) -> Result<Bytes, Failure> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        tracing::debug!(error = %e, limit, "Request body rejected");
        Failure::from(UntypedError::syntax(format!(
            "Request body could not be read or exceeds {limit} bytes"
        )))
    })
}
