//! GeoJSON map view of a processed parcel
//!
//! Pickup and delivery markers plus the route polyline, as a
//! `FeatureCollection`. GeoJSON positions are `[lng, lat]`.

use crate::domain::record::ParcelRecord;
use crate::domain::types::{Coordinates, RouteInfo, DEFAULT_COORDINATES};
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

fn position(c: &Coordinates) -> Value {
    json!([c.lng, c.lat])
}

fn point(c: &Coordinates, role: &str, label: &str) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": position(c) },
        "properties": { "role": role, "label": label }
    })
}

/// Delivery marker; flagged approximate when geocoding fell back to the default
fn delivery_point(c: &Coordinates, parcel_id: &str) -> Value {
    let mut feature = point(c, "delivery", parcel_id);
    feature["properties"]["approximate"] = json!(c.is_default());
    feature
}

/// Build the view. `None` when the parcel has no coordinates.
///
/// The pickup location is free text that is never geocoded, so its marker
/// sits at the default reference coordinate.
pub fn build_map_view(record: &ParcelRecord, route: &RouteInfo) -> Option<Value> {
    let delivery = record.recognition_result.address_extracted.coordinates?;
    let pickup_label = record
        .tracking_data
        .location_history
        .first()
        .map(|e| e.location.as_str())
        .unwrap_or_default();

    let mut features = vec![
        point(&DEFAULT_COORDINATES, "pickup", pickup_label),
        delivery_point(&delivery, &record.parcel_id),
    ];

    if !route.route_points.is_empty() {
        let line: Vec<Value> = route.route_points.iter().map(position).collect();
        features.push(json!({
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": line },
            "properties": {
                "role": "route",
                "distance_km": route.distance_km,
                "duration_min": route.duration_min
            }
        }));
    }

    Some(json!({ "type": "FeatureCollection", "features": features }))
}

/// Write the view as pretty JSON. Returns false when there was nothing to draw.
pub fn write_map_view<P: AsRef<Path>>(
    path: P,
    record: &ParcelRecord,
    route: &RouteInfo,
) -> anyhow::Result<bool> {
    let Some(view) = build_map_view(record, route) else {
        return Ok(false);
    };
    std::fs::write(path.as_ref(), serde_json::to_string_pretty(&view)?)?;
    info!(path = %path.as_ref().display(), parcel_id = %record.parcel_id, "map_view_written");
    Ok(true)
}
