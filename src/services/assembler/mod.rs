//! Parcel record assembly
//!
//! The pipeline runs one parcel start to finish, strictly in order:
//! decode -> barcode -> OCR -> parse -> manual fallback -> geocode -> route -> build.
//! Each stage degrades to a default instead of failing the parcel. The only
//! hard failure is having neither a usable image nor a manual address.

#[cfg(test)]
mod tests;

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::record::{
    format_timestamp, LocationEvent, ParcelRecord, PerformanceMetrics, RecognitionResult,
    RouteAssignment, TrackingData,
};
use crate::domain::types::{
    round_to, AddressComponents, BarcodeKind, ExtractionResult, ParcelStatus, RouteInfo,
};
use crate::infra::metrics::{Fallback, PipelineMetrics};
use crate::io::maps::{Geocoder, Router};
use crate::services::address_parser::parse_address;
use crate::services::audit::build_audit_trail;
use crate::services::barcode::{extract_barcode, BarcodeDecoder};
use crate::services::context::PipelineContext;
use crate::services::geo::{resolve_coordinates, resolve_route};
use crate::services::image_decoder::decode_image;
use crate::services::simulation::{SimulatedAssignment, SimulationPolicy};
use crate::services::text_extractor::{extract_text, TextRecognizer};
use chrono::{DateTime, Duration, Local, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Confidence reported for identifiers issued from the context counter
const GENERATED_ID_CONFIDENCE: f64 = 1.0;

/// Pickup location used when a request leaves it blank
pub const DEFAULT_PICKUP_LOCATION: &str = "Distribution Center A, San Francisco, CA";

/// One parcel's worth of input
#[derive(Debug, Clone, Default)]
pub struct ParcelRequest {
    /// Encoded PNG or JPEG bytes
    pub image: Option<Vec<u8>>,
    pub manual_address: Option<String>,
    pub pickup_location: Option<String>,
}

impl ParcelRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.image = Some(bytes);
        self
    }

    pub fn with_manual_address(mut self, address: &str) -> Self {
        self.manual_address = Some(address.to_string());
        self
    }

    pub fn with_pickup_location(mut self, location: &str) -> Self {
        self.pickup_location = Some(location.to_string());
        self
    }

    /// Trimmed manual address, `None` when absent or blank
    fn manual(&self) -> Option<&str> {
        self.manual_address.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn pickup(&self) -> &str {
        self.pickup_location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_PICKUP_LOCATION)
    }
}

/// Result of one pipeline run: the stored record plus the route it was built from
#[derive(Debug, Clone)]
pub struct ParcelOutcome {
    pub record: ParcelRecord,
    /// Route geometry is not part of the record; kept for the map view
    pub route: RouteInfo,
}

/// Identifier and recognition confidence settled before enrichment
struct Identity {
    parcel_id: String,
    kind: BarcodeKind,
    confidence: f64,
}

/// Orchestrates the recognition and enrichment stages for one parcel at a time
pub struct ParcelPipeline {
    barcode: Box<dyn BarcodeDecoder>,
    recognizer: Box<dyn TextRecognizer>,
    geocoder: Arc<dyn Geocoder>,
    router: Arc<dyn Router>,
    simulation: Box<dyn SimulationPolicy>,
    metrics: Arc<PipelineMetrics>,
}

impl ParcelPipeline {
    pub fn new(
        barcode: Box<dyn BarcodeDecoder>,
        recognizer: Box<dyn TextRecognizer>,
        geocoder: Arc<dyn Geocoder>,
        router: Arc<dyn Router>,
        simulation: Box<dyn SimulationPolicy>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self { barcode, recognizer, geocoder, router, simulation, metrics }
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Run every stage for one parcel, store the record in `ctx` and return it
    pub async fn process(
        &mut self,
        ctx: &PipelineContext,
        request: &ParcelRequest,
    ) -> PipelineResult<ParcelOutcome> {
        let start = Instant::now();
        let manual = request.manual();

        let (extraction, mut address) = self.recognize(request, manual).await?;

        if address.street.is_empty() {
            if let Some(manual) = manual {
                debug!(manual_address = %manual, "using_manual_address");
                address = AddressComponents::manual(manual);
            }
        }

        let identity = match extraction {
            ExtractionResult::Barcode { data, kind, confidence } => {
                Identity { parcel_id: data, kind, confidence }
            }
            ExtractionResult::Absent => Identity {
                parcel_id: ctx.next_parcel_id(Local::now().date_naive()),
                kind: BarcodeKind::Generated,
                confidence: GENERATED_ID_CONFIDENCE,
            },
        };

        // Same destination text for geocoding and routing
        let destination = if address.street.is_empty() {
            manual.unwrap_or_default().to_string()
        } else {
            address.street.clone()
        };

        address.coordinates =
            Some(resolve_coordinates(self.geocoder.as_ref(), &destination, &self.metrics).await);
        let route =
            resolve_route(self.router.as_ref(), request.pickup(), &destination, &self.metrics)
                .await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let assignment = self.simulation.assign();
        let record = build_record(
            identity,
            address,
            &route,
            request.pickup(),
            &assignment,
            Utc::now(),
            elapsed_ms,
        );

        let from_barcode = record.recognition_result.barcode_type == BarcodeKind::Qr;
        self.metrics.record_parcel(elapsed_ms, from_barcode);
        info!(
            parcel_id = %record.parcel_id,
            barcode_type = %record.recognition_result.barcode_type.as_str(),
            distance_km = %route.distance_km,
            duration_min = %route.duration_min,
            latency_ms = %elapsed_ms,
            "parcel_assembled"
        );

        if ctx.insert(record.clone()).is_some() {
            info!(parcel_id = %record.parcel_id, "parcel_record_replaced");
        }
        Ok(ParcelOutcome { record, route })
    }

    /// Image stages: decode, then barcode and OCR over the decoded buffers
    async fn recognize(
        &self,
        request: &ParcelRequest,
        manual: Option<&str>,
    ) -> PipelineResult<(ExtractionResult, AddressComponents)> {
        let Some(bytes) = request.image.as_deref() else {
            return match manual {
                Some(_) => Ok((ExtractionResult::Absent, AddressComponents::default())),
                None => Err(PipelineError::NoUsableInput(
                    "no image and no manual address".to_string(),
                )),
            };
        };

        let decoded = match decode_image(bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "image_decode_failed");
                self.metrics.record_fallback(Fallback::Decode);
                return match manual {
                    Some(_) => Ok((ExtractionResult::Absent, AddressComponents::default())),
                    None => Err(PipelineError::NoUsableInput(format!(
                        "image could not be decoded ({e}) and no manual address"
                    ))),
                };
            }
        };

        let extraction = extract_barcode(self.barcode.as_ref(), &decoded.color);
        let ocr = extract_text(self.recognizer.as_ref(), &decoded.luma, &self.metrics).await;
        let address =
            if ocr.has_text() { parse_address(&ocr.text) } else { AddressComponents::default() };

        Ok((extraction, address))
    }
}

/// `now` plus the route duration. A duration past chrono's range leaves the ETA at `now`.
fn estimated_arrival(now: DateTime<Utc>, route: &RouteInfo) -> DateTime<Utc> {
    match Duration::try_seconds(route.duration_secs()).and_then(|d| now.checked_add_signed(d)) {
        Some(eta) => eta,
        None => {
            warn!(duration_min = %route.duration_min, "route_duration_out_of_range");
            now
        }
    }
}

/// Assemble the five record blocks. Pure given its inputs.
fn build_record(
    identity: Identity,
    address: AddressComponents,
    route: &RouteInfo,
    pickup_location: &str,
    assignment: &SimulatedAssignment,
    now: DateTime<Utc>,
    elapsed_ms: u64,
) -> ParcelRecord {
    let timestamp = format_timestamp(now);
    let eta = format_timestamp(estimated_arrival(now, route));
    let route_day = now.with_timezone(&Local).date_naive();
    let audit_trail =
        build_audit_trail(&identity.parcel_id, &timestamp, assignment.custody_driver_number);

    ParcelRecord {
        recognition_result: RecognitionResult {
            barcode_data: identity.parcel_id.clone(),
            barcode_type: identity.kind,
            confidence_score: round_to(identity.confidence, 3),
            address_extracted: address,
            processing_time_ms: elapsed_ms,
        },
        route_assignment: RouteAssignment {
            driver_id: format!("DRV-{}", assignment.driver_number),
            route_id: format!("RT-{}-{}", route_day.format("%Y-%m-%d"), assignment.route_number),
            position_in_route: assignment.position_in_route,
            estimated_delivery: eta.clone(),
            priority_level: assignment.priority,
            optimization_score: assignment.optimization_score,
        },
        tracking_data: TrackingData {
            current_status: ParcelStatus::PickedUp,
            location_history: vec![LocationEvent {
                timestamp,
                location: pickup_location.to_string(),
                event: ParcelStatus::PickedUp,
            }],
            predicted_eta: eta,
            confidence_interval: route.duration_secs() / 10,
        },
        audit_trail,
        performance_metrics: PerformanceMetrics {
            scan_latency_ms: elapsed_ms,
            route_optimization_time_ms: assignment.route_optimization_time_ms,
            api_response_time_ms: assignment.api_response_time_ms,
        },
        parcel_id: identity.parcel_id,
    }
}
