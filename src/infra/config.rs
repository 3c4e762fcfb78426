//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! The maps API key is never read from the file. `[maps].api_key_env` names
//! the environment variable that holds it.

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct MapsConfig {
    #[serde(default = "default_maps_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_maps_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            base_url: default_maps_base_url(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_maps_timeout_ms(),
        }
    }
}

fn default_maps_base_url() -> String {
    "https://maps.googleapis.com/maps/api".to_string()
}

fn default_api_key_env() -> String {
    "MAPS_API_KEY".to_string()
}

fn default_maps_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Path or name of the tesseract executable
    #[serde(default = "default_ocr_binary")]
    pub binary: String,
    #[serde(default = "default_ocr_language")]
    pub language: String,
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: default_ocr_binary(),
            language: default_ocr_language(),
            timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

fn default_ocr_binary() -> String {
    "tesseract".to_string()
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_ocr_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_pickup_location")]
    pub pickup_location: String,
    /// File path for record egress (JSONL format)
    #[serde(default = "default_egress_file")]
    pub egress_file: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { pickup_location: default_pickup_location(), egress_file: default_egress_file() }
    }
}

fn default_pickup_location() -> String {
    "Distribution Center A, San Francisco, CA".to_string()
}

fn default_egress_file() -> String {
    "parcels.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SimulationConfig {
    /// Seed for the simulated assignment fields; unset means OS entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub maps: MapsConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    maps_base_url: String,
    maps_api_key_env: String,
    maps_api_key: Option<String>,
    maps_timeout_ms: u64,
    ocr_binary: String,
    ocr_language: String,
    ocr_timeout_secs: u64,
    pickup_location: String,
    egress_file: String,
    simulation_seed: Option<u64>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        let maps_api_key = read_secret(&toml_config.maps.api_key_env);
        Self {
            maps_base_url: toml_config.maps.base_url.trim_end_matches('/').to_string(),
            maps_api_key_env: toml_config.maps.api_key_env,
            maps_api_key,
            maps_timeout_ms: toml_config.maps.timeout_ms,
            ocr_binary: toml_config.ocr.binary,
            ocr_language: toml_config.ocr.language,
            ocr_timeout_secs: toml_config.ocr.timeout_secs,
            pickup_location: toml_config.pipeline.pickup_location,
            egress_file: toml_config.pipeline.egress_file,
            simulation_seed: toml_config.simulation.seed,
            config_file,
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        // Check for --config argument
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(&Self::resolve_config_path(args))
    }

    /// Load from an explicit path, falling back to defaults on any error
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn maps_base_url(&self) -> &str {
        &self.maps_base_url
    }

    pub fn maps_api_key_env(&self) -> &str {
        &self.maps_api_key_env
    }

    pub fn maps_api_key(&self) -> Option<&str> {
        self.maps_api_key.as_deref()
    }

    pub fn maps_timeout_ms(&self) -> u64 {
        self.maps_timeout_ms
    }

    pub fn ocr_binary(&self) -> &str {
        &self.ocr_binary
    }

    pub fn ocr_language(&self) -> &str {
        &self.ocr_language
    }

    pub fn ocr_timeout_secs(&self) -> u64 {
        self.ocr_timeout_secs
    }

    pub fn pickup_location(&self) -> &str {
        &self.pickup_location
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn simulation_seed(&self) -> Option<u64> {
        self.simulation_seed
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to point the maps client at another provider (mock server, tests)
    pub fn with_maps_base_url(mut self, url: &str) -> Self {
        self.maps_base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Builder method to override the provider request timeout
    pub fn with_maps_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.maps_timeout_ms = timeout_ms;
        self
    }

    /// Builder method to inject the API key directly
    pub fn with_maps_api_key(mut self, key: Option<&str>) -> Self {
        self.maps_api_key = key.map(str::to_string);
        self
    }
}

/// Read a secret from the environment, treating blank values as unset
fn read_secret(var: &str) -> Option<String> {
    env::var(var).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
