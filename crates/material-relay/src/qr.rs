//! QR code rendering for deep links

use crate::error::{RelayError, Result};
use crate::links::data_url;
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;

/// Edge length in pixels when the caller gives none
pub const DEFAULT_QR_SIZE: u32 = 200;
/// Larger requests are clamped to this edge length
pub const MAX_QR_SIZE: u32 = 1024;

/// Render `data` as a PNG QR code at least `size` pixels wide, as a data URL
pub fn qr_data_url(data: &str, size: u32) -> Result<String> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| RelayError::BadRequest(format!("Cannot encode QR code: {}", e)))?;

    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(size, size)
        .build();

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| RelayError::Io(Box::new(std::io::Error::other(e))))?;

    Ok(data_url("image/png", &png))
}

/// Parse the `size` query parameter
pub fn parse_size(size: Option<&str>) -> Result<u32> {
    let Some(size) = size.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_QR_SIZE);
    };

    match size.parse::<u32>() {
        Ok(0) | Err(_) => Err(RelayError::BadRequest(format!("Invalid size: {}", size))),
        Ok(n) => Ok(n.min(MAX_QR_SIZE)),
    }
}
