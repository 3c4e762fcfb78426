//! Parcel tracking record - the system's external output contract
//!
//! Field names and nesting are consumed by dashboards and downstream
//! services; do not rename them.

use crate::domain::types::{AddressComponents, BarcodeKind, ParcelStatus, PriorityLevel};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Format a UTC instant the way every record timestamp is written
#[inline]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Complete tracking record for one parcel
#[derive(Debug, Clone, Serialize)]
pub struct ParcelRecord {
    pub parcel_id: String,
    pub recognition_result: RecognitionResult,
    pub route_assignment: RouteAssignment,
    pub tracking_data: TrackingData,
    pub audit_trail: AuditTrail,
    pub performance_metrics: PerformanceMetrics,
}

impl ParcelRecord {
    /// Compact single-line JSON (egress and session output)
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Indented JSON for display
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecognitionResult {
    pub barcode_data: String,
    pub barcode_type: BarcodeKind,
    pub confidence_score: f64,
    pub address_extracted: AddressComponents,
    pub processing_time_ms: u64,
}

/// Simulated driver/route assignment
#[derive(Debug, Clone, Serialize)]
pub struct RouteAssignment {
    pub driver_id: String,
    pub route_id: String,
    pub position_in_route: u32,
    pub estimated_delivery: String,
    pub priority_level: PriorityLevel,
    pub optimization_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingData {
    pub current_status: ParcelStatus,
    pub location_history: Vec<LocationEvent>,
    pub predicted_eta: String,
    /// Seconds; 10% of the route duration
    pub confidence_interval: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationEvent {
    pub timestamp: String,
    pub location: String,
    pub event: ParcelStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditTrail {
    pub blockchain_hash: String,
    pub chain_of_custody: Vec<String>,
    pub anomalies_detected: Vec<String>,
    pub compliance_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceMetrics {
    pub scan_latency_ms: u64,
    pub route_optimization_time_ms: u64,
    pub api_response_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(format_timestamp(ts), "2026-03-04T05:06:07.000000Z");
    }

    #[test]
    fn test_location_event_serializes_status_label() {
        let event = LocationEvent {
            timestamp: "2026-03-04T05:06:07.000000Z".to_string(),
            location: "Depot".to_string(),
            event: ParcelStatus::PickedUp,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "picked_up");
        assert_eq!(json["location"], "Depot");
    }
}
