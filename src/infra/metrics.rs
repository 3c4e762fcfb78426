//! Lock-free pipeline metrics and reporting
//!
//! Counters are plain atomics so a shared `PipelineMetrics` can be handed to
//! several sessions without a lock.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only; do not use them for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Which degraded path a stage took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Decode,
    Ocr,
    Geocode,
    Route,
}

/// Lock-free metrics collector
pub struct PipelineMetrics {
    /// Records assembled (monotonic)
    parcels_total: AtomicU64,
    /// Parcels identified by a decoded QR payload
    barcodes_decoded: AtomicU64,
    /// Parcels that needed a generated identifier
    ids_generated: AtomicU64,
    /// Images that failed to decode
    decode_failures: AtomicU64,
    /// OCR runs that faulted
    ocr_failures: AtomicU64,
    /// Geocodes replaced by the default coordinate
    geocode_fallbacks: AtomicU64,
    /// Routes replaced by the empty route
    route_fallbacks: AtomicU64,
    /// Sum of scan latencies (ms)
    latency_sum_ms: AtomicU64,
    /// Max scan latency (ms)
    latency_max_ms: AtomicU64,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            parcels_total: AtomicU64::new(0),
            barcodes_decoded: AtomicU64::new(0),
            ids_generated: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            ocr_failures: AtomicU64::new(0),
            geocode_fallbacks: AtomicU64::new(0),
            route_fallbacks: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_max_ms: AtomicU64::new(0),
        }
    }

    /// Record one assembled parcel and its end-to-end latency
    #[inline]
    pub fn record_parcel(&self, scan_latency_ms: u64, from_barcode: bool) {
        self.parcels_total.fetch_add(1, Ordering::Relaxed);
        if from_barcode {
            self.barcodes_decoded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.ids_generated.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_sum_ms.fetch_add(scan_latency_ms, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_ms, scan_latency_ms);
    }

    #[inline]
    pub fn record_fallback(&self, fallback: Fallback) {
        let counter = match fallback {
            Fallback::Decode => &self.decode_failures,
            Fallback::Ocr => &self.ocr_failures,
            Fallback::Geocode => &self.geocode_fallbacks,
            Fallback::Route => &self.route_fallbacks,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough snapshot of all counters
    pub fn report(&self) -> MetricsSummary {
        let parcels_total = self.parcels_total.load(Ordering::Relaxed);
        let latency_sum_ms = self.latency_sum_ms.load(Ordering::Relaxed);
        let avg_latency_ms = if parcels_total > 0 { latency_sum_ms / parcels_total } else { 0 };

        MetricsSummary {
            parcels_total,
            barcodes_decoded: self.barcodes_decoded.load(Ordering::Relaxed),
            ids_generated: self.ids_generated.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            ocr_failures: self.ocr_failures.load(Ordering::Relaxed),
            geocode_fallbacks: self.geocode_fallbacks.load(Ordering::Relaxed),
            route_fallbacks: self.route_fallbacks.load(Ordering::Relaxed),
            avg_latency_ms,
            max_latency_ms: self.latency_max_ms.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pipeline counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSummary {
    pub parcels_total: u64,
    pub barcodes_decoded: u64,
    pub ids_generated: u64,
    pub decode_failures: u64,
    pub ocr_failures: u64,
    pub geocode_fallbacks: u64,
    pub route_fallbacks: u64,
    pub avg_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            parcels = %self.parcels_total,
            barcodes = %self.barcodes_decoded,
            generated_ids = %self.ids_generated,
            decode_failures = %self.decode_failures,
            ocr_failures = %self.ocr_failures,
            geocode_fallbacks = %self.geocode_fallbacks,
            route_fallbacks = %self.route_fallbacks,
            avg_latency_ms = %self.avg_latency_ms,
            max_latency_ms = %self.max_latency_ms,
            "pipeline_metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_parcel() {
        let metrics = PipelineMetrics::new();
        metrics.record_parcel(100, true);
        metrics.record_parcel(300, false);
        metrics.record_parcel(200, false);

        let summary = metrics.report();
        assert_eq!(summary.parcels_total, 3);
        assert_eq!(summary.barcodes_decoded, 1);
        assert_eq!(summary.ids_generated, 2);
        assert_eq!(summary.avg_latency_ms, 200);
        assert_eq!(summary.max_latency_ms, 300);
    }

    #[test]
    fn test_record_fallbacks() {
        let metrics = PipelineMetrics::new();
        metrics.record_fallback(Fallback::Geocode);
        metrics.record_fallback(Fallback::Geocode);
        metrics.record_fallback(Fallback::Route);
        metrics.record_fallback(Fallback::Ocr);

        let summary = metrics.report();
        assert_eq!(summary.geocode_fallbacks, 2);
        assert_eq!(summary.route_fallbacks, 1);
        assert_eq!(summary.ocr_failures, 1);
        assert_eq!(summary.decode_failures, 0);
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(PipelineMetrics::new().report(), MetricsSummary::default());
    }
}
