//! Mock mapping provider
//!
//! Serves canned geocoding and directions responses in the provider's JSON
//! shape so the pipeline can run offline.
//!
//! Endpoints:
//! - GET /geocode/json?address=..&key=..
//! - GET /directions/json?origin=..&destination=..&mode=driving&key=..
//!
//! Behavior:
//! 1. Listens on configurable port (default 9000)
//! 2. Missing `key` -> `REQUEST_DENIED`
//! 3. `--status` forces every reply to that provider status (e.g. ZERO_RESULTS)
//! 4. Geocode results are a deterministic offset from a fixed origin, so
//!    distinct addresses land on distinct points
//!
//! Usage:
//!   cargo run --bin mock_maps -- --port 9000
//!   cargo run --bin mock_maps -- --port 9000 --status ZERO_RESULTS

use bytes::Bytes;
use clap::Parser;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

const ORIGIN_LAT: f64 = 37.7749;
const ORIGIN_LNG: f64 = -122.4194;

#[derive(Parser, Debug)]
#[command(name = "mock_maps")]
#[command(about = "Mock geocoding/directions provider for local runs")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "9000")]
    port: u16,

    /// Force this provider status on every reply instead of OK
    #[arg(long)]
    status: Option<String>,

    /// Route steps returned per directions reply
    #[arg(long, default_value = "4")]
    steps: usize,
}

/// Stable small offset (up to ~0.05 deg) derived from the query text
fn offset_for(text: &str) -> (f64, f64) {
    let h = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    let dlat = (h % 1000) as f64 / 20_000.0;
    let dlng = ((h / 1000) % 1000) as f64 / 20_000.0;
    (dlat, dlng)
}

fn geocode_body(address: &str) -> Value {
    let (dlat, dlng) = offset_for(address);
    json!({
        "status": "OK",
        "results": [{
            "formatted_address": address,
            "geometry": { "location": { "lat": ORIGIN_LAT + dlat, "lng": ORIGIN_LNG + dlng } }
        }]
    })
}

fn directions_body(origin: &str, destination: &str, steps: usize) -> Value {
    let (olat, olng) = offset_for(origin);
    let (dlat, dlng) = offset_for(destination);
    let (start_lat, start_lng) = (ORIGIN_LAT + olat, ORIGIN_LNG + olng);
    let (end_lat, end_lng) = (ORIGIN_LAT + dlat, ORIGIN_LNG + dlng);
    let steps = steps.max(1);

    let step_list: Vec<Value> = (1..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            json!({
                "end_location": {
                    "lat": start_lat + (end_lat - start_lat) * t,
                    "lng": start_lng + (end_lng - start_lng) * t
                }
            })
        })
        .collect();

    // ~111 km per degree, city driving at ~30 km/h
    let meters = ((end_lat - start_lat).hypot(end_lng - start_lng) * 111_000.0).max(500.0);
    let seconds = meters / 30_000.0 * 3600.0;

    json!({
        "status": "OK",
        "routes": [{
            "legs": [{
                "distance": { "value": meters.round() },
                "duration": { "value": seconds.round() },
                "steps": step_list
            }]
        }]
    })
}

fn query_params(req: &Request<hyper::body::Incoming>) -> HashMap<String, String> {
    req.uri().query().map(url_decode_pairs).unwrap_or_default()
}

/// Minimal `application/x-www-form-urlencoded` decoding
fn url_decode_pairs(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((decode(k), decode(v)))
        })
        .collect()
}

fn decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(b) => {
                        out.push(b);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn json_response(body: Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    args: Arc<Args>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let params = query_params(&req);
    let path = req.uri().path().to_string();

    if req.method() != Method::GET {
        let mut resp = Response::new(Full::new(Bytes::from("Method Not Allowed")));
        *resp.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
        return Ok(resp);
    }

    let key_ok = params.get("key").is_some_and(|k| !k.is_empty());
    let forced = args.status.as_deref();

    let body = match path.as_str() {
        "/geocode/json" | "/directions/json" if !key_ok => {
            json!({ "status": "REQUEST_DENIED", "error_message": "The provided API key is invalid." })
        }
        "/geocode/json" | "/directions/json" if forced.is_some() => {
            json!({ "status": forced.unwrap_or_default(), "results": [], "routes": [] })
        }
        "/geocode/json" => {
            let address = params.get("address").map(String::as_str).unwrap_or_default();
            println!("[MOCK] geocode '{}'", address);
            geocode_body(address)
        }
        "/directions/json" => {
            let origin = params.get("origin").map(String::as_str).unwrap_or_default();
            let destination = params.get("destination").map(String::as_str).unwrap_or_default();
            println!("[MOCK] directions '{}' -> '{}'", origin, destination);
            directions_body(origin, destination, args.steps)
        }
        _ => {
            let mut resp = Response::new(Full::new(Bytes::from("Not Found")));
            *resp.status_mut() = StatusCode::NOT_FOUND;
            return Ok(resp);
        }
    };

    Ok(json_response(body))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Arc::new(Args::parse());
    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = TcpListener::bind(addr).await?;

    println!("[MOCK] Maps provider listening on http://{}", addr);
    if let Some(ref status) = args.status {
        println!("[MOCK] Forcing status {}", status);
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                eprintln!("[MOCK] Accept error: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let args = args.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, args.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                eprintln!("[MOCK] Connection error from {}: {}", peer, e);
            }
        });
    }
}
