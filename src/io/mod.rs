//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `maps` - HTTP client for the geocoding and directions provider
//! - `tesseract` - OCR through the `tesseract` command-line engine
//! - `egress` - Parcel record output to file (JSONL format)
//! - `map_view` - GeoJSON rendering of pickup, delivery and route

pub mod egress;
pub mod map_view;
pub mod maps;
pub mod tesseract;

// Re-export commonly used types
pub use egress::ParcelEgress;
pub use maps::{Geocoder, MapsClient, Router};
pub use tesseract::TesseractRecognizer;
