//! Parcel intake - recognition, enrichment and tracking-record assembly
//!
//! Reads a parcel image and/or a manually entered address, extracts the
//! identifier and destination, geocodes and routes it, and emits a
//! structured tracking record.
//!
//! Module structure:
//! - `domain/` - Core types (ParcelRecord, AddressComponents, errors)
//! - `io/` - External interfaces (maps provider, tesseract, egress, map view)
//! - `services/` - Pipeline stages and record assembly
//! - `infra/` - Infrastructure (Config, Metrics)

use anyhow::Context;
use clap::{Parser, Subcommand};
use parcel_intake::infra::{Config, PipelineMetrics};
use parcel_intake::io::map_view::write_map_view;
use parcel_intake::io::{MapsClient, ParcelEgress, TesseractRecognizer};
use parcel_intake::services::{
    ParcelPipeline, ParcelRequest, PipelineContext, QrDecoder, RandomSimulation,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Parcel intake pipeline
#[derive(Parser, Debug)]
#[command(name = "parcel-intake", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one parcel and print its record as JSON
    Process {
        /// Parcel label image (PNG or JPEG)
        #[arg(long)]
        image: Option<PathBuf>,
        /// Destination address used when none can be read from the image
        #[arg(long)]
        manual_address: Option<String>,
        /// Pickup location (defaults to the configured one)
        #[arg(long)]
        pickup: Option<String>,
        /// Write a GeoJSON map view of the parcel to this path
        #[arg(long)]
        map: Option<PathBuf>,
    },
    /// Read one JSON request per stdin line and print one record per line
    Session,
}

/// One stdin line in session mode
#[derive(Debug, Deserialize)]
struct SessionLine {
    #[serde(default)]
    image: Option<PathBuf>,
    #[serde(default)]
    manual_address: Option<String>,
    #[serde(default)]
    pickup_location: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: INFO, use RUST_LOG=debug for per-stage detail.
    // Logs go to stderr so stdout carries only records.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(
        version = %env!("CARGO_PKG_VERSION"),
        git_hash = %env!("GIT_HASH"),
        "parcel_intake_starting"
    );

    let config_path = args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[]));
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        maps_base_url = %config.maps_base_url(),
        maps_api_key_env = %config.maps_api_key_env(),
        maps_api_key_set = %config.maps_api_key().is_some(),
        maps_timeout_ms = %config.maps_timeout_ms(),
        ocr_binary = %config.ocr_binary(),
        ocr_language = %config.ocr_language(),
        pickup_location = %config.pickup_location(),
        egress_file = %config.egress_file(),
        simulation_seed = ?config.simulation_seed(),
        "config_loaded"
    );
    if config.maps_api_key().is_none() {
        warn!(env = %config.maps_api_key_env(), "maps_api_key_missing_geocoding_will_fall_back");
    }

    let recognizer = TesseractRecognizer::new(&config);
    if !recognizer.is_available().await {
        warn!(binary = %config.ocr_binary(), "ocr_engine_unavailable");
    }

    let maps = Arc::new(MapsClient::new(&config).context("Failed to build maps HTTP client")?);
    let metrics = Arc::new(PipelineMetrics::new());
    let mut pipeline = ParcelPipeline::new(
        Box::new(QrDecoder),
        Box::new(recognizer),
        maps.clone(),
        maps,
        Box::new(RandomSimulation::new(config.simulation_seed())),
        metrics.clone(),
    );
    let egress =
        (!config.egress_file().is_empty()).then(|| ParcelEgress::new(config.egress_file()));
    let ctx = PipelineContext::new();

    let run_id = uuid::Uuid::now_v7().to_string();
    let span = info_span!("run", run_id = %run_id);

    let result = match args.command {
        Command::Process { image, manual_address, pickup, map } => {
            let pickup = pickup.unwrap_or_else(|| config.pickup_location().to_string());
            let request = ParcelRequest {
                image: image.as_deref().and_then(read_image_or_warn),
                manual_address,
                pickup_location: Some(pickup),
            };
            run_process(&mut pipeline, &ctx, &request, egress.as_ref(), map.as_deref())
                .instrument(span)
                .await
        }
        Command::Session => {
            run_session(&mut pipeline, &ctx, &config, egress.as_ref()).instrument(span).await
        }
    };

    metrics.report().log();
    info!("parcel_intake_shutdown_complete");
    result
}

fn read_image(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))
}

/// An unreadable image drops to the manual-address flow; the pipeline rejects
/// the parcel if there is no manual address either.
fn read_image_or_warn(path: &Path) -> Option<Vec<u8>> {
    match read_image(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "image_unreadable");
            None
        }
    }
}

async fn run_process(
    pipeline: &mut ParcelPipeline,
    ctx: &PipelineContext,
    request: &ParcelRequest,
    egress: Option<&ParcelEgress>,
    map: Option<&Path>,
) -> anyhow::Result<()> {
    let outcome = pipeline.process(ctx, request).await?;

    if let Some(egress) = egress {
        egress.write_record(&outcome.record);
    }
    if let Some(path) = map {
        if !write_map_view(path, &outcome.record, &outcome.route)? {
            warn!(parcel_id = %outcome.record.parcel_id, "map_view_skipped_no_coordinates");
        }
    }

    println!("{}", outcome.record.to_json_pretty());
    Ok(())
}

/// Process stdin requests sequentially against one shared context.
/// A bad line is logged and skipped; it does not end the session.
async fn run_session(
    pipeline: &mut ParcelPipeline,
    ctx: &PipelineContext,
    config: &Config,
    egress: Option<&ParcelEgress>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed: SessionLine = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(line = %line_no, error = %e, "session_line_invalid");
                continue;
            }
        };

        let request = ParcelRequest {
            image: parsed.image.as_deref().and_then(read_image_or_warn),
            manual_address: parsed.manual_address,
            pickup_location: parsed
                .pickup_location
                .or_else(|| Some(config.pickup_location().to_string())),
        };

        match pipeline.process(ctx, &request).await {
            Ok(outcome) => {
                if let Some(egress) = egress {
                    egress.write_record(&outcome.record);
                }
                println!("{}", outcome.record.to_json());
            }
            Err(e) => error!(line = %line_no, error = %e, "session_parcel_rejected"),
        }
    }

    info!(records = %ctx.len(), lines = %line_no, "session_ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unreadable_image_is_dropped() {
        assert_eq!(read_image_or_warn(Path::new("/nonexistent/label.png")), None);
    }

    #[test]
    fn test_readable_image_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG").unwrap();
        file.flush().unwrap();
        assert_eq!(read_image_or_warn(file.path()), Some(b"\x89PNG".to_vec()));
    }
}
