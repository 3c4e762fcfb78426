//! Tests for the parcel pipeline

use super::*;
use crate::domain::error::{MapsError, RecognitionError};
use crate::domain::types::{Coordinates, PriorityLevel};
use crate::services::barcode::{render_qr, QrDecoder};
use crate::services::image_decoder::encode_png;
use crate::services::simulation::FixedSimulation;
use crate::services::text_extractor::RecognizedText;
use async_trait::async_trait;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use parking_lot::Mutex;
use regex::Regex;

const MANUAL: &str = "123 Main St, San Francisco, CA 94102";
const PICKUP: &str = "Distribution Center A, San Francisco, CA";

struct StubBarcode(Option<&'static str>);

impl BarcodeDecoder for StubBarcode {
    fn decode(&self, _image: &RgbImage) -> Result<Option<String>, RecognitionError> {
        Ok(self.0.map(str::to_string))
    }
}

struct StubRecognizer(Option<&'static str>);

#[async_trait]
impl TextRecognizer for StubRecognizer {
    async fn recognize(&self, _image: &GrayImage) -> Result<RecognizedText, RecognitionError> {
        match self.0 {
            Some(text) => {
                Ok(RecognizedText { text: text.to_string(), token_confidences: vec![90, 70] })
            }
            None => Err(RecognitionError::Command("tesseract missing".to_string())),
        }
    }
}

/// Records every query; answers with fixed values or fails
#[derive(Default)]
struct StubMaps {
    fail: bool,
    /// Provider duration override in seconds
    route_seconds: Option<f64>,
    geocode_queries: Mutex<Vec<String>>,
    route_queries: Mutex<Vec<(String, String)>>,
}

impl StubMaps {
    fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true, ..Self::default() })
    }

    fn with_route_seconds(seconds: f64) -> Arc<Self> {
        Arc::new(Self { route_seconds: Some(seconds), ..Self::default() })
    }
}

#[async_trait]
impl Geocoder for StubMaps {
    async fn geocode(&self, address: &str) -> Result<Coordinates, MapsError> {
        self.geocode_queries.lock().push(address.to_string());
        if self.fail || address.is_empty() {
            return Err(MapsError::Status("ZERO_RESULTS".to_string()));
        }
        Ok(Coordinates::new(37.78, -122.41))
    }
}

#[async_trait]
impl Router for StubMaps {
    async fn route(&self, origin: &str, destination: &str) -> Result<RouteInfo, MapsError> {
        self.route_queries.lock().push((origin.to_string(), destination.to_string()));
        if self.fail {
            return Err(MapsError::Status("NOT_FOUND".to_string()));
        }
        Ok(RouteInfo::from_provider_units(
            4_200.0,
            self.route_seconds.unwrap_or(900.0),
            vec![Coordinates::new(37.77, -122.42), Coordinates::new(37.78, -122.41)],
        ))
    }
}

fn fixed_assignment() -> SimulatedAssignment {
    SimulatedAssignment {
        driver_number: 417,
        route_number: 42,
        position_in_route: 7,
        priority: PriorityLevel::Express,
        optimization_score: 0.91,
        custody_driver_number: 233,
        route_optimization_time_ms: 1200,
        api_response_time_ms: 17,
    }
}

fn pipeline(
    barcode: Option<&'static str>,
    ocr: Option<&'static str>,
    maps: Arc<StubMaps>,
) -> ParcelPipeline {
    ParcelPipeline::new(
        Box::new(StubBarcode(barcode)),
        Box::new(StubRecognizer(ocr)),
        maps.clone(),
        maps,
        Box::new(FixedSimulation(fixed_assignment())),
        Arc::new(PipelineMetrics::new()),
    )
}

fn png() -> Vec<u8> {
    encode_png(&DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]))))
}

#[tokio::test]
async fn test_manual_address_end_to_end() {
    let ctx = PipelineContext::new();
    let mut pipeline = pipeline(None, None, StubMaps::ok());
    let request = ParcelRequest::new().with_manual_address(MANUAL).with_pickup_location(PICKUP);

    let record = pipeline.process(&ctx, &request).await.unwrap().record;
    let json = serde_json::to_value(&record).unwrap();

    assert_eq!(json["recognition_result"]["barcode_type"], "Generated ID");
    assert_eq!(json["recognition_result"]["confidence_score"], 1.0);
    assert_eq!(json["tracking_data"]["current_status"], "picked_up");
    let hash = json["audit_trail"]["blockchain_hash"].as_str().unwrap();
    assert!(Regex::new(r"^0x[0-9a-f]{16}$").unwrap().is_match(hash));
    assert!(Regex::new(r"^PRC-\d{8}-\d{6}$").unwrap().is_match(&record.parcel_id));
    assert_eq!(record.recognition_result.barcode_data, record.parcel_id);
}

#[tokio::test]
async fn test_manual_address_fills_components() {
    let ctx = PipelineContext::new();
    let maps = StubMaps::ok();
    let mut pipeline = pipeline(None, None, maps.clone());
    let request = ParcelRequest::new().with_manual_address(MANUAL);

    let record = pipeline.process(&ctx, &request).await.unwrap().record;
    let address = &record.recognition_result.address_extracted;
    assert_eq!(address.street, MANUAL);
    assert_eq!(address.city, "");
    assert_eq!(address.postal_code, "");
    assert_eq!(address.coordinates, Some(Coordinates::new(37.78, -122.41)));

    assert_eq!(*maps.geocode_queries.lock(), vec![MANUAL.to_string()]);
    assert_eq!(*maps.route_queries.lock(), vec![(PICKUP.to_string(), MANUAL.to_string())]);
}

#[tokio::test]
async fn test_simulated_fields_and_timing() {
    let ctx = PipelineContext::new();
    let mut pipeline = pipeline(None, None, StubMaps::ok());
    let request = ParcelRequest::new().with_manual_address(MANUAL);

    let record = pipeline.process(&ctx, &request).await.unwrap().record;
    let assignment = &record.route_assignment;
    assert_eq!(assignment.driver_id, "DRV-417");
    assert!(Regex::new(r"^RT-\d{4}-\d{2}-\d{2}-42$").unwrap().is_match(&assignment.route_id));
    assert_eq!(assignment.position_in_route, 7);
    assert_eq!(assignment.priority_level, PriorityLevel::Express);
    assert_eq!(assignment.optimization_score, 0.91);
    assert_eq!(assignment.estimated_delivery, record.tracking_data.predicted_eta);

    // 900 s route -> 15 min -> 90 s interval
    assert_eq!(record.tracking_data.confidence_interval, 90);
    let history = &record.tracking_data.location_history;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].location, PICKUP);
    assert_eq!(history[0].event, ParcelStatus::PickedUp);
    assert!(record.tracking_data.predicted_eta > history[0].timestamp);

    assert_eq!(
        record.audit_trail.chain_of_custody,
        vec!["warehouse".to_string(), "driver_233".to_string(), "pending".to_string()]
    );
    assert_eq!(
        record.audit_trail.blockchain_hash,
        crate::services::audit::create_blockchain_hash(&record.parcel_id, &history[0].timestamp)
    );
    assert_eq!(record.performance_metrics.route_optimization_time_ms, 1200);
    assert_eq!(record.performance_metrics.api_response_time_ms, 17);
    assert_eq!(
        record.performance_metrics.scan_latency_ms,
        record.recognition_result.processing_time_ms
    );
}

#[tokio::test]
async fn test_generated_ids_increment_and_are_stored() {
    let ctx = PipelineContext::new();
    let mut pipeline = pipeline(None, None, StubMaps::ok());
    let request = ParcelRequest::new().with_manual_address(MANUAL);

    let first = pipeline.process(&ctx, &request).await.unwrap().record;
    let second = pipeline.process(&ctx, &request).await.unwrap().record;
    assert!(first.parcel_id.ends_with("-000001"));
    assert!(second.parcel_id.ends_with("-000002"));
    assert_eq!(ctx.len(), 2);
    assert!(ctx.get(&first.parcel_id).is_some());

    let summary = pipeline.metrics().report();
    assert_eq!(summary.parcels_total, 2);
    assert_eq!(summary.ids_generated, 2);
}

#[tokio::test]
async fn test_maps_failures_fall_back() {
    let ctx = PipelineContext::new();
    let mut pipeline = pipeline(None, None, StubMaps::failing());
    let request = ParcelRequest::new().with_manual_address(MANUAL);

    let record = pipeline.process(&ctx, &request).await.unwrap().record;
    assert_eq!(
        record.recognition_result.address_extracted.coordinates,
        Some(Coordinates::new(37.7749, -122.4194))
    );
    assert_eq!(record.tracking_data.confidence_interval, 0);
    // Zero-duration route: ETA equals the pickup timestamp
    assert_eq!(
        record.tracking_data.predicted_eta,
        record.tracking_data.location_history[0].timestamp
    );

    let summary = pipeline.metrics().report();
    assert_eq!(summary.geocode_fallbacks, 1);
    assert_eq!(summary.route_fallbacks, 1);
}

#[tokio::test]
async fn test_barcode_and_ocr_path() {
    let ctx = PipelineContext::new();
    let maps = StubMaps::ok();
    let mut pipeline =
        pipeline(Some("PKG-7781"), Some("742 Evergreen Ave\nSpringfield IL 62704"), maps.clone());
    let request = ParcelRequest::new().with_image(png()).with_manual_address(MANUAL);

    let record = pipeline.process(&ctx, &request).await.unwrap().record;
    assert_eq!(record.parcel_id, "PKG-7781");
    assert_eq!(record.recognition_result.barcode_type, BarcodeKind::Qr);
    assert_eq!(record.recognition_result.confidence_score, 0.99);

    // OCR street wins over the manual address
    let address = &record.recognition_result.address_extracted;
    assert_eq!(address.street, "742 Evergreen Ave");
    assert_eq!(address.city, "Springfield IL");
    assert_eq!(address.postal_code, "62704");
    assert_eq!(*maps.geocode_queries.lock(), vec!["742 Evergreen Ave".to_string()]);

    assert_eq!(pipeline.metrics().report().barcodes_decoded, 1);
}

#[tokio::test]
async fn test_ocr_without_street_uses_manual_address() {
    let ctx = PipelineContext::new();
    let mut pipeline = pipeline(None, Some("Springfield IL 62704"), StubMaps::ok());
    let request = ParcelRequest::new().with_image(png()).with_manual_address(MANUAL);

    let record = pipeline.process(&ctx, &request).await.unwrap().record;
    let address = &record.recognition_result.address_extracted;
    assert_eq!(address.street, MANUAL);
    assert_eq!(address.city, "");
    assert_eq!(address.postal_code, "");
}

#[tokio::test]
async fn test_rescanned_barcode_replaces_record() {
    let ctx = PipelineContext::new();
    let mut pipeline = pipeline(Some("PKG-1"), None, StubMaps::ok());
    let request = ParcelRequest::new().with_image(png()).with_manual_address(MANUAL);

    pipeline.process(&ctx, &request).await.unwrap();
    pipeline.process(&ctx, &request).await.unwrap();
    assert_eq!(ctx.len(), 1);
    assert_eq!(ctx.parcel_ids(), vec!["PKG-1".to_string()]);
}

#[tokio::test]
async fn test_image_without_signal_still_produces_record() {
    let ctx = PipelineContext::new();
    let mut pipeline = pipeline(None, None, StubMaps::ok());
    let request = ParcelRequest::new().with_image(png());

    let record = pipeline.process(&ctx, &request).await.unwrap().record;
    assert_eq!(record.recognition_result.barcode_type, BarcodeKind::Generated);
    assert_eq!(
        record.recognition_result.address_extracted.coordinates,
        Some(Coordinates::new(37.7749, -122.4194))
    );
    assert_eq!(pipeline.metrics().report().ocr_failures, 1);
}

#[tokio::test]
async fn test_no_input_is_rejected() {
    let ctx = PipelineContext::new();
    let mut pipeline = pipeline(None, None, StubMaps::ok());

    let err = pipeline.process(&ctx, &ParcelRequest::new()).await.unwrap_err();
    assert!(matches!(err, PipelineError::NoUsableInput(_)));

    let blank = ParcelRequest::new().with_manual_address("   ");
    assert!(pipeline.process(&ctx, &blank).await.is_err());
    assert!(ctx.is_empty());
}

#[tokio::test]
async fn test_corrupt_image_needs_manual_address() {
    let ctx = PipelineContext::new();
    let mut pipeline = pipeline(None, None, StubMaps::ok());
    let garbage = b"\x89PNG\r\n\x1a\nnot really".to_vec();

    let err = pipeline
        .process(&ctx, &ParcelRequest::new().with_image(garbage.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoUsableInput(_)));

    let request = ParcelRequest::new().with_image(garbage).with_manual_address(MANUAL);
    let record = pipeline.process(&ctx, &request).await.unwrap().record;
    assert_eq!(record.recognition_result.address_extracted.street, MANUAL);
    assert_eq!(pipeline.metrics().report().decode_failures, 2);
    // Counter only advances for generated ids
    assert!(record.parcel_id.ends_with("-000001"));
}

#[tokio::test]
async fn test_blank_pickup_uses_default() {
    let ctx = PipelineContext::new();
    let maps = StubMaps::ok();
    let mut pipeline = pipeline(None, None, maps.clone());
    let request = ParcelRequest::new().with_manual_address(MANUAL).with_pickup_location(" ");

    pipeline.process(&ctx, &request).await.unwrap();
    assert_eq!(maps.route_queries.lock()[0].0, DEFAULT_PICKUP_LOCATION);
}

#[tokio::test]
async fn test_oversized_route_duration_keeps_eta_at_pickup() {
    for seconds in [1e13, 1e18, f64::MAX] {
        let ctx = PipelineContext::new();
        let mut pipeline = pipeline(None, None, StubMaps::with_route_seconds(seconds));
        let request = ParcelRequest::new().with_manual_address(MANUAL);

        let record = pipeline.process(&ctx, &request).await.unwrap().record;
        let pickup = &record.tracking_data.location_history[0].timestamp;
        assert_eq!(&record.tracking_data.predicted_eta, pickup);
        assert_eq!(&record.route_assignment.estimated_delivery, pickup);
    }
}

#[tokio::test]
async fn test_id_and_route_dates_use_local_day() {
    let ctx = PipelineContext::new();
    let mut pipeline = pipeline(None, None, StubMaps::ok());
    let request = ParcelRequest::new().with_manual_address(MANUAL);

    let before = chrono::Local::now().date_naive();
    let record = pipeline.process(&ctx, &request).await.unwrap().record;
    let after = chrono::Local::now().date_naive();

    let id_day = &record.parcel_id[4..12];
    let route_day = record.route_assignment.route_id[3..13].replace('-', "");
    assert_eq!(id_day, route_day);
    assert!(
        id_day == before.format("%Y%m%d").to_string()
            || id_day == after.format("%Y%m%d").to_string()
    );
}

#[tokio::test]
async fn test_qr_label_decoded_end_to_end() {
    let ctx = PipelineContext::new();
    let maps = StubMaps::ok();
    let mut pipeline = ParcelPipeline::new(
        Box::new(QrDecoder),
        Box::new(StubRecognizer(None)),
        maps.clone(),
        maps,
        Box::new(FixedSimulation(fixed_assignment())),
        Arc::new(PipelineMetrics::new()),
    );
    let label = encode_png(&DynamicImage::ImageRgb8(render_qr("PKG-0001")));
    let request = ParcelRequest::new().with_image(label).with_manual_address(MANUAL);

    let record = pipeline.process(&ctx, &request).await.unwrap().record;
    assert_eq!(record.parcel_id, "PKG-0001");
    assert_eq!(record.recognition_result.barcode_type, BarcodeKind::Qr);
    assert_eq!(record.recognition_result.confidence_score, 0.99);
    assert_eq!(record.recognition_result.address_extracted.street, MANUAL);
    assert!(ctx.get("PKG-0001").is_some());
    assert_eq!(pipeline.metrics().report().barcodes_decoded, 1);
}
