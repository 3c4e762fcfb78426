//! Tesseract OCR adapter
//!
//! Pipeline: GrayImage → temp PNG → `tesseract <png> stdout -l <lang> tsv` → parse.
//!
//! TSV columns: level page_num block_num par_num line_num word_num
//! left top width height conf text. `conf` is -1 for non-word rows.

use crate::domain::error::RecognitionError;
use crate::infra::config::Config;
use crate::services::text_extractor::{RecognizedText, TextRecognizer};
use async_trait::async_trait;
use image::{GrayImage, ImageFormat};
use std::io::{Cursor, Write};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const TSV_COLUMNS: usize = 12;

/// OCR via the tesseract command-line tool
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: String,
    language: String,
    timeout_secs: u64,
}

impl TesseractRecognizer {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.ocr_binary().to_string(),
            language: config.ocr_language().to_string(),
            timeout_secs: config.ocr_timeout_secs(),
        }
    }

    /// Check the binary is installed and runnable
    pub async fn is_available(&self) -> bool {
        matches!(
            Command::new(&self.binary).arg("--version").output().await,
            Ok(output) if output.status.success()
        )
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, img: &GrayImage) -> Result<RecognizedText, RecognitionError> {
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, ImageFormat::Png)
            .map_err(|e| RecognitionError::Output(format!("failed to stage image: {e}")))?;

        let mut staged = tempfile::Builder::new().prefix("parcel-ocr-").suffix(".png").tempfile()?;
        staged.write_all(png.get_ref())?;
        staged.flush()?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(staged.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("tsv")
            .kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| RecognitionError::Timeout(self.timeout_secs))?
            .map_err(|e| RecognitionError::Command(format!("failed to execute {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::Command(format!(
                "exit {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let recognized = parse_tsv(&tsv)?;
        debug!(
            tokens = %recognized.token_confidences.len(),
            chars = %recognized.text.len(),
            "tesseract_completed"
        );
        Ok(recognized)
    }
}

/// Rebuild text and collect confidences from tesseract TSV output.
/// Words on the same line are space-joined; a new block or paragraph
/// starts after a blank line.
pub fn parse_tsv(tsv: &str) -> Result<RecognizedText, RecognitionError> {
    let mut lines = tsv.lines();
    match lines.next() {
        Some(header) if header.starts_with("level") => {}
        Some(other) => {
            return Err(RecognitionError::Output(format!("unexpected header: {other}")));
        }
        None => return Ok(RecognizedText::default()),
    }

    let mut text = String::new();
    let mut token_confidences = Vec::new();
    let mut current_line: Option<(u32, u32, u32, u32)> = None;

    for row in lines {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < TSV_COLUMNS - 1 {
            continue;
        }

        let conf = cols[10].trim().parse::<f64>().map(|c| c as i32).unwrap_or(-1);
        token_confidences.push(conf);

        let word = cols.get(11).map(|w| w.trim()).unwrap_or("");
        if word.is_empty() {
            continue;
        }

        let num = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        let key = (num(1), num(2), num(3), num(4));

        match current_line {
            Some(prev) if prev == key => text.push(' '),
            Some(prev) => {
                text.push('\n');
                if (prev.0, prev.1, prev.2) != (key.0, key.1, key.2) {
                    text.push('\n');
                }
            }
            None => {}
        }
        text.push_str(word);
        current_line = Some(key);
    }

    Ok(RecognizedText { text, token_confidences })
}
