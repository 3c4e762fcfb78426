//! Mapping-provider client (geocoding and driving directions)
//!
//! Protocol (Google Maps web service shape):
//! - GET {base}/geocode/json?address=..&key=..
//!   -> `status`, `results[0].geometry.location.{lat,lng}`
//! - GET {base}/directions/json?origin=..&destination=..&mode=driving&key=..
//!   -> `status`, `routes[0].legs[0].{distance.value, duration.value, steps[].end_location}`
//!
//! Any status other than "OK" is an error. Callers decide the fallback.

use crate::domain::error::MapsError;
use crate::domain::types::{Coordinates, RouteInfo};
use crate::infra::config::Config;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const STATUS_OK: &str = "OK";

/// Resolves free-text addresses to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinates, MapsError>;
}

/// Computes a driving route between two free-text locations
#[async_trait]
pub trait Router: Send + Sync {
    async fn route(&self, origin: &str, destination: &str) -> Result<RouteInfo, MapsError>;
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<&LatLng> for Coordinates {
    fn from(l: &LatLng) -> Self {
        Coordinates::new(l.lat, l.lng)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    distance: ValueField,
    duration: ValueField,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct Step {
    end_location: LatLng,
}

fn status_error(status: String, message: Option<String>) -> MapsError {
    match message {
        Some(msg) => MapsError::Status(format!("{status}: {msg}")),
        None => MapsError::Status(status),
    }
}

fn parse_geocode(resp: GeocodeResponse) -> Result<Coordinates, MapsError> {
    if resp.status != STATUS_OK {
        return Err(status_error(resp.status, resp.error_message));
    }
    resp.results
        .first()
        .map(|r| Coordinates::from(&r.geometry.location))
        .ok_or_else(|| MapsError::Malformed("no geocode results".to_string()))
}

fn parse_directions(resp: DirectionsResponse) -> Result<RouteInfo, MapsError> {
    if resp.status != STATUS_OK {
        return Err(status_error(resp.status, resp.error_message));
    }
    let leg = resp
        .routes
        .first()
        .and_then(|r| r.legs.first())
        .ok_or_else(|| MapsError::Malformed("no route legs".to_string()))?;

    let points = leg.steps.iter().map(|s| Coordinates::from(&s.end_location)).collect();
    Ok(RouteInfo::from_provider_units(leg.distance.value, leg.duration.value, points))
}

/// HTTP client for the mapping provider. One instance is reused for all calls.
pub struct MapsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl MapsClient {
    pub fn new(config: &Config) -> Result<Self, MapsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.maps_timeout_ms()))
            .build()?;

        Ok(Self {
            http,
            base_url: config.maps_base_url().to_string(),
            api_key: config.maps_api_key().map(str::to_string),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MapsError> {
        let Some(ref key) = self.api_key else {
            return Err(MapsError::MissingApiKey);
        };

        let url = format!("{}/{}", self.base_url, endpoint);
        let start = Instant::now();

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", key.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body = response.json::<T>().await?;
        debug!(endpoint = %endpoint, latency_ms = %start.elapsed().as_millis(), "maps_response");
        Ok(body)
    }
}

#[async_trait]
impl Geocoder for MapsClient {
    async fn geocode(&self, address: &str) -> Result<Coordinates, MapsError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(MapsError::EmptyQuery);
        }

        let resp: GeocodeResponse = self.get_json("geocode/json", &[("address", address)]).await?;
        let coordinates = parse_geocode(resp)?;
        info!(address = %address, coordinates = %coordinates, "geocoded");
        Ok(coordinates)
    }
}

#[async_trait]
impl Router for MapsClient {
    async fn route(&self, origin: &str, destination: &str) -> Result<RouteInfo, MapsError> {
        let (origin, destination) = (origin.trim(), destination.trim());
        if origin.is_empty() || destination.is_empty() {
            return Err(MapsError::EmptyQuery);
        }

        let resp: DirectionsResponse = self
            .get_json(
                "directions/json",
                &[("origin", origin), ("destination", destination), ("mode", "driving")],
            )
            .await?;
        let route = parse_directions(resp)?;
        info!(
            distance_km = %route.distance_km,
            duration_min = %route.duration_min,
            points = %route.route_points.len(),
            "route_computed"
        );
        Ok(route)
    }
}
