//! Domain models - core parcel types and the tracking record
//!
//! This module contains the canonical data types used throughout the system:
//! - `ExtractionResult` / `OcrResult` - outputs of the recognition stages
//! - `AddressComponents` - structured destination built up across stages
//! - `RouteInfo` - distance, duration and polyline from the router
//! - `ParcelRecord` - the terminal five-block tracking record
//! - `error` - typed failures for every fallible stage

pub mod error;
pub mod record;
pub mod types;

// Re-export commonly used types at module level
pub use error::{DecodeError, MapsError, PipelineError, RecognitionError};
pub use record::ParcelRecord;
pub use types::{
    AddressComponents, BarcodeKind, Coordinates, ExtractionResult, OcrResult, RouteInfo,
    DEFAULT_COORDINATES,
};
