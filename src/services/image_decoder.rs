//! Image decoding into the two pixel buffers the recognizers consume

use crate::domain::error::DecodeError;
use image::{GrayImage, ImageFormat, RgbImage};
use std::path::Path;
use tracing::debug;

/// Decoded parcel image. Owned by one pipeline invocation.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// 3-channel color buffer (barcode detection)
    pub color: RgbImage,
    /// Single-channel luminance buffer (OCR)
    pub luma: GrayImage,
}

impl DecodedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }
}

/// Decode PNG or JPEG bytes. Grayscale sources are expanded to RGB and
/// color sources reduced to luminance, so both buffers always exist.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let format = image::guess_format(bytes)?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(DecodeError::UnsupportedFormat(format!("{format:?}")));
    }

    let img = image::load_from_memory_with_format(bytes, format)?;
    let decoded = DecodedImage { color: img.to_rgb8(), luma: img.to_luma8() };

    let (width, height) = decoded.dimensions();
    debug!(format = ?format, width = %width, height = %height, "image_decoded");
    Ok(decoded)
}

/// Read and decode an image file
pub fn decode_image_file<P: AsRef<Path>>(path: P) -> Result<DecodedImage, DecodeError> {
    let bytes = std::fs::read(path)?;
    decode_image(&bytes)
}

#[cfg(test)]
pub(crate) fn encode_png(img: &image::DynamicImage) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}
