//! QR rendering subsystem.
//!
//! # Data Flow
//! ```text
//! validated text
//!     → QrRenderer::render (blocking, CPU bound)
//!     → png.rs (symbol matrix → scaled grayscale image → PNG bytes)
//!     → RenderError on failure, translated to an UntypedError at the
//!       pipeline boundary
//! ```
//!
//! # Design Decisions
//! - The symbol encoding itself comes from the `qrcode` crate
//! - Output is deterministic: same text and options, same bytes
//! - Renderers are synchronous; callers move them off the async runtime

pub mod png;

pub use png::PngRenderer;

use crate::error::UntypedError;

/// Error correction robustness of the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCorrection {
    Low,
    Medium,
    Quartile,
    High,
}

/// Rendering failures.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The text does not fit in any symbol version.
    #[error("data too long for a QR code symbol")]
    DataTooLong,
    #[error("QR encoding failed: {0}")]
    Encode(String),
    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

impl From<RenderError> for UntypedError {
    fn from(err: RenderError) -> Self {
        UntypedError::new(err.to_string())
    }
}

/// Turns text into image bytes.
pub trait QrRenderer: Send + Sync + 'static {
    fn render(&self, text: &str) -> Result<Vec<u8>, RenderError>;

    /// Media type of the produced bytes.
    fn content_type(&self) -> &'static str {
        "image/png"
    }
}
