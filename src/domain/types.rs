//! Shared types for the parcel pipeline

use serde::{Serialize, Serializer};

/// Fixed confidence reported for any decoded QR payload.
/// The detector gives no real signal, so this is a placeholder.
pub const BARCODE_CONFIDENCE: f64 = 0.99;

/// Reference point substituted when geocoding fails (San Francisco city hall area)
pub const DEFAULT_COORDINATES: Coordinates = Coordinates { lat: 37.7749, lng: -122.4194 };

/// Latitude/longitude pair. Serializes as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when this is exactly the geocoding fallback value
    pub fn is_default(&self) -> bool {
        *self == DEFAULT_COORDINATES
    }
}

impl Serialize for Coordinates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq([self.lat, self.lng])
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

/// Source of the parcel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeKind {
    Qr,
    /// No code was readable; a sequence-based id was issued instead
    Generated,
}

impl BarcodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarcodeKind::Qr => "QR_CODE",
            BarcodeKind::Generated => "Generated ID",
        }
    }
}

impl Serialize for BarcodeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Output of the barcode/QR extractor
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    Barcode { data: String, kind: BarcodeKind, confidence: f64 },
    Absent,
}

impl ExtractionResult {
    /// Wrap a decoded QR payload. Empty payloads count as no detection.
    pub fn qr(data: impl Into<String>) -> Self {
        let data = data.into();
        if data.is_empty() {
            return ExtractionResult::Absent;
        }
        ExtractionResult::Barcode { data, kind: BarcodeKind::Qr, confidence: BARCODE_CONFIDENCE }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ExtractionResult::Absent)
    }
}

/// Output of the text extractor. Empty text means "no signal", not an error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OcrResult {
    pub text: String,
    pub confidence: f64,
}

impl OcrResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Structured destination, built incrementally per parcel
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AddressComponents {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    #[serde(serialize_with = "serialize_optional_coordinates")]
    pub coordinates: Option<Coordinates>,
}

impl AddressComponents {
    /// Components carrying only a manually entered address in `street`
    pub fn manual(address: &str) -> Self {
        Self { street: address.to_string(), ..Self::default() }
    }
}

/// Absent coordinates serialize as an empty array
fn serialize_optional_coordinates<S: Serializer>(
    coordinates: &Option<Coordinates>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match coordinates {
        Some(c) => c.serialize(serializer),
        None => serializer.collect_seq(std::iter::empty::<f64>()),
    }
}

/// Route between pickup and destination
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RouteInfo {
    pub distance_km: f64,
    pub duration_min: f64,
    pub route_points: Vec<Coordinates>,
}

impl RouteInfo {
    /// Zero-distance, zero-duration route used when routing fails
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from raw provider units (meters, seconds), rounding like the dashboard does
    pub fn from_provider_units(meters: f64, seconds: f64, route_points: Vec<Coordinates>) -> Self {
        Self {
            distance_km: round_to(meters / 1000.0, 1),
            duration_min: (seconds / 60.0).round(),
            route_points,
        }
    }

    /// Route duration in whole seconds, never negative
    pub fn duration_secs(&self) -> i64 {
        (self.duration_min.max(0.0) * 60.0) as i64
    }
}

/// Delivery priority assigned by the (simulated) route planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Standard,
    Priority,
    Express,
}

impl PriorityLevel {
    pub const ALL: [PriorityLevel; 3] =
        [PriorityLevel::Standard, PriorityLevel::Priority, PriorityLevel::Express];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::Standard => "standard",
            PriorityLevel::Priority => "priority",
            PriorityLevel::Express => "express",
        }
    }
}

/// Parcel lifecycle stage. Intake only ever records the pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    PickedUp,
}

/// Round to a fixed number of decimal places
#[inline]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
