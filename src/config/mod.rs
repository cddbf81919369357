//! Configuration module for pingflux.
//!
//! Provides TOML/YAML configuration loading and validation for:
//! - InfluxDB sink settings (address, database, measurement, credentials)
//! - Probe tool options (binary, retry, summary period, interval, policies)
//! - Probe targets

mod app;
mod validation;

pub use app::{AppConfig, HostsConfig, InfluxConfig, ProbeOptions};
pub use validation::{ConfigError, expand_env_vars};

// Re-export constants
pub use app::{
    DEFAULT_CONFIG_PATH, DEFAULT_INTERVAL, DEFAULT_PROBE_BINARY, DEFAULT_SINK_TIMEOUT,
    DEFAULT_SUMMARY,
};
