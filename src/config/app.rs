//! Application configuration structures.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::metric::OnParseError;
use crate::pipeline::MalformedLinePolicy;

use super::validation::{ConfigError, expand_env_vars, require_single_line};

// =============================================================================
// Constants
// =============================================================================

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/grafana/influxdb/ping/config.toml";

/// Default probe binary.
pub const DEFAULT_PROBE_BINARY: &str = "/usr/bin/fping";

/// Default per-host summary period (fping `-Q`).
pub const DEFAULT_SUMMARY: Duration = Duration::from_secs(10);

/// Default per-target probe interval (fping `-p`).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Default HTTP timeout for sink requests.
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(10);

fn default_sink_timeout() -> Duration {
    DEFAULT_SINK_TIMEOUT
}

fn default_binary() -> PathBuf {
    PathBuf::from(DEFAULT_PROBE_BINARY)
}

fn default_summary() -> Duration {
    DEFAULT_SUMMARY
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

// =============================================================================
// InfluxDB Configuration
// =============================================================================

/// Time-series sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// Base URL of the InfluxDB HTTP API (e.g. `http://localhost:8086`).
    pub address: String,

    /// Target database (the bucket on InfluxDB 2.x).
    pub database: String,

    /// Organization, required by InfluxDB 2.x and ignored by 1.x.
    #[serde(default)]
    pub org: String,

    /// Measurement name used for every point.
    pub measurement: String,

    /// Value of the `probe` tag, identifying this vantage point.
    pub probe_name: String,

    /// User name (empty disables auth).
    #[serde(default)]
    pub username: String,

    /// Password, sent with the user name as `username:password` token.
    #[serde(default)]
    pub password: String,

    /// HTTP request timeout (default: 10s).
    #[serde(default = "default_sink_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl InfluxConfig {
    /// Create a sink configuration with empty credentials.
    pub fn new(
        address: impl Into<String>,
        database: impl Into<String>,
        measurement: impl Into<String>,
        probe_name: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            database: database.into(),
            measurement: measurement.into(),
            probe_name: probe_name.into(),
            org: String::new(),
            username: String::new(),
            password: String::new(),
            timeout: DEFAULT_SINK_TIMEOUT,
        }
    }

    /// Set credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.address).map_err(|e| {
            ConfigError::ValidationError(format!(
                "invalid influxdb address '{}': {}",
                self.address, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "influxdb address '{}' must use http or https",
                self.address
            )));
        }

        require_single_line("influxdb.database", &self.database)?;
        require_single_line("influxdb.measurement", &self.measurement)?;
        require_single_line("influxdb.probe_name", &self.probe_name)?;

        if self.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "influxdb.timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Probe Options
// =============================================================================

/// Options controlling the probe tool and the parsing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOptions {
    /// Path of the fping executable (default: /usr/bin/fping).
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Retry count per ping (fping `-r`).
    #[serde(default)]
    pub retry: u32,

    /// Summary period (fping `-Q`, whole seconds; default: 10s).
    #[serde(default = "default_summary", with = "humantime_serde")]
    pub summary: Duration,

    /// Per-target interval (fping `-p`; default: 1s).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// What to do with an unparsable loss or RTT number.
    #[serde(default)]
    pub on_parse_error: OnParseError,

    /// What to do with a data line whose tokens are malformed.
    #[serde(default)]
    pub on_malformed_line: MalformedLinePolicy,

    /// Extra arguments inserted before the host list.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            retry: 0,
            summary: DEFAULT_SUMMARY,
            interval: DEFAULT_INTERVAL,
            on_parse_error: OnParseError::default(),
            on_malformed_line: MalformedLinePolicy::default(),
            extra_args: Vec::new(),
        }
    }
}

impl ProbeOptions {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.binary.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "options.binary cannot be empty".to_string(),
            ));
        }
        if self.summary.as_secs() == 0 {
            return Err(ConfigError::ValidationError(format!(
                "options.summary must be at least 1s, got {}",
                humantime::format_duration(self.summary)
            )));
        }
        if self.interval.as_millis() == 0 {
            return Err(ConfigError::ValidationError(format!(
                "options.interval must be at least 1ms, got {}",
                humantime::format_duration(self.interval)
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Hosts
// =============================================================================

/// Probe targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostsConfig {
    /// Hostnames or IP addresses handed to the probe tool.
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl HostsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.is_empty() {
            return Err(ConfigError::ValidationError(
                "hosts.hosts must list at least one target".to_string(),
            ));
        }
        for host in &self.hosts {
            if host.is_empty() || host.chars().any(char::is_whitespace) {
                return Err(ConfigError::ValidationError(format!(
                    "invalid host '{}': must be non-empty without whitespace",
                    host
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Sink settings.
    pub influxdb: InfluxConfig,

    /// Probe tool and pipeline settings.
    #[serde(default)]
    pub options: ProbeOptions,

    /// Probe targets.
    pub hosts: HostsConfig,
}

impl AppConfig {
    /// Load configuration from a TOML or YAML file.
    ///
    /// Files ending in `.toml` are parsed as TOML, everything else as YAML.
    /// Credentials have `${VAR}` references expanded after parsing.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        let mut config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };
        config.expand_credentials();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without validating it.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a YAML document without validating it.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.influxdb.validate()?;
        self.options.validate()?;
        self.hosts.validate()?;
        Ok(())
    }

    fn expand_credentials(&mut self) {
        self.influxdb.username = expand_env_vars(&self.influxdb.username);
        self.influxdb.password = expand_env_vars(&self.influxdb.password);
    }
}
