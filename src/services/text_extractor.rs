//! OCR text extraction
//!
//! The luminance buffer is histogram-equalized before recognition. The
//! recognizer reports per-token integer confidences (percent, -1 for
//! non-word entries); only strictly positive ones count toward the aggregate.

use crate::domain::error::RecognitionError;
use crate::domain::types::OcrResult;
use crate::infra::metrics::{Fallback, PipelineMetrics};
use async_trait::async_trait;
use image::GrayImage;
use tracing::{debug, info, warn};

/// Raw recognizer output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    pub token_confidences: Vec<i32>,
}

/// OCR capability: grayscale image in, text plus token confidences out
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &GrayImage) -> Result<RecognizedText, RecognitionError>;
}

/// Mean of strictly positive token confidences, scaled to [0, 1]. Zero if none.
pub fn aggregate_confidence(token_confidences: &[i32]) -> f64 {
    let (sum, count) = token_confidences
        .iter()
        .filter(|&&c| c > 0)
        .fold((0i64, 0u32), |(sum, count), &c| (sum + c.min(100) as i64, count + 1));

    if count == 0 {
        return 0.0;
    }
    sum as f64 / count as f64 / 100.0
}

/// Equalize, recognize and aggregate. Recognizer faults yield an empty result.
pub async fn extract_text(
    recognizer: &dyn TextRecognizer,
    luma: &GrayImage,
    metrics: &PipelineMetrics,
) -> OcrResult {
    let enhanced = imageproc::contrast::equalize_histogram(luma);

    match recognizer.recognize(&enhanced).await {
        Ok(raw) => {
            let result = OcrResult {
                text: raw.text.trim().to_string(),
                confidence: aggregate_confidence(&raw.token_confidences),
            };
            if result.has_text() {
                info!(
                    chars = %result.text.len(),
                    confidence = %format!("{:.2}", result.confidence),
                    "ocr_extracted"
                );
            } else {
                debug!("ocr_no_text");
            }
            result
        }
        Err(e) => {
            warn!(error = %e, "ocr_extraction_failed");
            metrics.record_fallback(Fallback::Ocr);
            OcrResult::empty()
        }
    }
}
