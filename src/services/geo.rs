//! Geocoding and routing with fixed fallbacks
//!
//! Failures never propagate: geocoding falls back to `DEFAULT_COORDINATES`,
//! routing to a zero route.

use crate::domain::types::{Coordinates, RouteInfo, DEFAULT_COORDINATES};
use crate::infra::metrics::{Fallback, PipelineMetrics};
use crate::io::maps::{Geocoder, Router};
use tracing::warn;

pub async fn resolve_coordinates(
    geocoder: &dyn Geocoder,
    address: &str,
    metrics: &PipelineMetrics,
) -> Coordinates {
    match geocoder.geocode(address).await {
        Ok(coordinates) => coordinates,
        Err(e) => {
            warn!(address = %address, error = %e, "geocode_failed_using_default");
            metrics.record_fallback(Fallback::Geocode);
            DEFAULT_COORDINATES
        }
    }
}

pub async fn resolve_route(
    router: &dyn Router,
    origin: &str,
    destination: &str,
    metrics: &PipelineMetrics,
) -> RouteInfo {
    match router.route(origin, destination).await {
        Ok(route) => route,
        Err(e) => {
            warn!(origin = %origin, destination = %destination, error = %e, "route_failed_using_empty");
            metrics.record_fallback(Fallback::Route);
            RouteInfo::empty()
        }
    }
}
