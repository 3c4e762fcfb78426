//! Infrastructure - configuration and metrics
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults, secrets)
//! - `metrics` - Lock-free pipeline metrics

pub mod config;
pub mod metrics;

// Re-export commonly used types
pub use config::Config;
pub use metrics::PipelineMetrics;
