//! Error types for the pipeline stages.
//!
//! Every fallible stage returns one of these; the assembler converts them
//! into defaults at the point of use, so none of them aborts a parcel on
//! its own.

use thiserror::Error;

/// Image decoding failures.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Input buffer was empty.
    #[error("Empty image buffer")]
    Empty,

    /// Format sniffed but not accepted (only PNG and JPEG are).
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Bytes could not be decoded.
    #[error("Corrupt image: {0}")]
    Corrupt(#[from] image::ImageError),

    /// Image file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Barcode and OCR engine failures.
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// The engine ran but reported a fault.
    #[error("Detector fault: {0}")]
    Detector(String),

    /// External recognizer could not be launched or exited non-zero.
    #[error("Recognizer command failed: {0}")]
    Command(String),

    /// External recognizer did not finish in time.
    #[error("Recognizer timed out after {0}s")]
    Timeout(u64),

    /// Recognizer output could not be parsed.
    #[error("Malformed recognizer output: {0}")]
    Output(String),

    /// Temp file handling failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mapping-provider failures (geocoding and routing).
#[derive(Error, Debug)]
pub enum MapsError {
    /// Nothing to look up.
    #[error("Empty query")]
    EmptyQuery,

    /// No API credential configured.
    #[error("Maps API key not configured")]
    MissingApiKey,

    /// Provider answered with a non-OK status.
    #[error("Provider status: {0}")]
    Status(String),

    /// Status was OK but the expected fields were missing.
    #[error("Malformed provider response: {0}")]
    Malformed(String),

    /// Transport or HTTP-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures that prevent a record from being created at all.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Neither a decodable image nor a manual address was supplied.
    #[error("No usable input: {0}")]
    NoUsableInput(String),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
