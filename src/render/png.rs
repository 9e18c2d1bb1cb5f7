//! PNG output for QR symbols.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};
use qrcode::{types::QrError, Color, EcLevel, QrCode};

use crate::config::RenderConfig;
use crate::render::{ErrorCorrection, QrRenderer, RenderError};

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// Renders a QR symbol as a grayscale PNG.
///
/// The image is `width` pixels square, or larger when the symbol plus its
/// quiet zone needs more than one pixel per module.
#[derive(Debug, Clone)]
pub struct PngRenderer {
    width: u32,
    margin: u32,
    ec_level: ErrorCorrection,
}

impl PngRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            width: config.width,
            margin: config.margin,
            ec_level: ErrorCorrection::Medium,
        }
    }

    pub fn with_error_correction(mut self, ec_level: ErrorCorrection) -> Self {
        self.ec_level = ec_level;
        self
    }

    fn encode(&self, text: &str) -> Result<QrCode, RenderError> {
        let level = match self.ec_level {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::High => EcLevel::H,
        };
        QrCode::with_error_correction_level(text.as_bytes(), level).map_err(|e| match e {
            QrError::DataTooLong => RenderError::DataTooLong,
            other => RenderError::Encode(other.to_string()),
        })
    }

    fn rasterize(&self, code: &QrCode) -> GrayImage {
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let total = modules + 2 * self.margin;
        let size = self.width.max(total);

        GrayImage::from_fn(size, size, |x, y| {
            // Map the pixel back onto the module grid, quiet zone included.
            let mx = (x as u64 * total as u64 / size as u64) as u32;
            let my = (y as u64 * total as u64 / size as u64) as u32;
            if mx < self.margin || my < self.margin {
                return LIGHT;
            }
            let (cx, cy) = (mx - self.margin, my - self.margin);
            if cx >= modules || cy >= modules {
                return LIGHT;
            }
            match colors[(cy * modules + cx) as usize] {
                Color::Dark => DARK,
                Color::Light => LIGHT,
            }
        })
    }
}

impl QrRenderer for PngRenderer {
    fn render(&self, text: &str) -> Result<Vec<u8>, RenderError> {
        let code = self.encode(text)?;
        let image = self.rasterize(&code);

        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;
        Ok(png.into_inner())
    }
}
