//! Barcode/QR extraction
//!
//! Only the first grid that decodes to a non-empty payload is kept.
//! Multiple codes in one image are not supported.

use crate::domain::error::RecognitionError;
use crate::domain::types::ExtractionResult;
use image::RgbImage;
use tracing::{debug, info, warn};

/// 2D-code decode capability: image in, payload text (if any) out
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, image: &RgbImage) -> Result<Option<String>, RecognitionError>;
}

/// QR decoder backed by `rqrr`
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl BarcodeDecoder for QrDecoder {
    fn decode(&self, img: &RgbImage) -> Result<Option<String>, RecognitionError> {
        let luma = image::imageops::grayscale(img);
        let (width, height) = luma.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                luma.get_pixel(x as u32, y as u32).0[0]
            });
        let grids = prepared.detect_grids();
        debug!(grids = %grids.len(), "qr_grids_detected");

        let mut last_error = None;
        for grid in &grids {
            match grid.decode() {
                Ok((_meta, content)) if !content.is_empty() => return Ok(Some(content)),
                Ok(_) => continue,
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) => Err(RecognitionError::Detector(e.to_string())),
            None => Ok(None),
        }
    }
}

/// Run the decoder and wrap the outcome. Detector faults become `Absent`.
pub fn extract_barcode(decoder: &dyn BarcodeDecoder, image: &RgbImage) -> ExtractionResult {
    match decoder.decode(image) {
        Ok(Some(data)) => {
            let result = ExtractionResult::qr(data);
            if let ExtractionResult::Barcode { ref data, .. } = result {
                info!(payload = %data, "qr_decoded");
            }
            result
        }
        Ok(None) => {
            debug!("qr_not_found");
            ExtractionResult::Absent
        }
        Err(e) => {
            warn!(error = %e, "qr_extraction_failed");
            ExtractionResult::Absent
        }
    }
}

/// Render a QR code for `payload` as a black-on-white label image
#[cfg(test)]
pub(crate) fn render_qr(payload: &str) -> RgbImage {
    use image::Rgb;
    use qrcode::{Color, QrCode};

    const SCALE: u32 = 6;
    const QUIET: u32 = 4;

    let code = QrCode::new(payload.as_bytes()).unwrap();
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let side = (modules + 2 * QUIET) * SCALE;

    RgbImage::from_fn(side, side, |x, y| {
        let span = QUIET..QUIET + modules;
        let (mx, my) = (x / SCALE, y / SCALE);
        let dark = span.contains(&mx)
            && span.contains(&my)
            && colors[((my - QUIET) * modules + (mx - QUIET)) as usize] == Color::Dark;
        if dark {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
}
