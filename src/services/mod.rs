//! Services - recognition stages and record assembly
//!
//! This module contains the pipeline stages and the state they share:
//! - `image_decoder` - PNG/JPEG bytes to color and luminance buffers
//! - `barcode` - QR detection over the color buffer
//! - `text_extractor` - Histogram-equalized OCR over the luminance buffer
//! - `address_parser` - Free text to street / city / postal code
//! - `geo` - Geocoding and routing with fixed fallbacks
//! - `simulation` - Simulated driver and route assignment values
//! - `audit` - Audit trail and truncated-hash helpers
//! - `context` - Parcel id counter and record store
//! - `assembler` - Orchestrates the stages into a `ParcelRecord`

pub mod address_parser;
pub mod assembler;
pub mod audit;
pub mod barcode;
pub mod context;
pub mod geo;
pub mod image_decoder;
pub mod simulation;
pub mod text_extractor;

// Re-export commonly used types
pub use assembler::{ParcelOutcome, ParcelPipeline, ParcelRequest, DEFAULT_PICKUP_LOCATION};
pub use barcode::{BarcodeDecoder, QrDecoder};
pub use context::PipelineContext;
pub use simulation::{FixedSimulation, RandomSimulation, SimulatedAssignment, SimulationPolicy};
pub use text_extractor::TextRecognizer;
