//! pingflux - fping to InfluxDB bridge
//!
//! Runs fping in summary mode, reads the per-host summary lines it prints on
//! stderr, and writes one InfluxDB point per host and summary period.
//!
//! # Architecture
//!
//! - **Probe**: fping invocation, process lifecycle and line grammar
//! - **Metric**: numeric conversion, tagging and timestamping of samples
//! - **Sink**: InfluxDB line protocol over HTTP
//! - **Pipeline**: line by line glue between the three, with readiness
//!   notification after the first successful write
//!
//! # Example
//!
//! ```rust,no_run
//! use pingflux::{AppConfig, InfluxClient, MetricBuilder, Pipeline, ProbeCommand, ProbeRunner};
//!
//! # async fn run() -> Result<(), pingflux::Error> {
//! let config = AppConfig::load("/etc/grafana/influxdb/ping/config.toml")?;
//! let client = InfluxClient::new(&config.influxdb)?;
//! client.ping().await?;
//!
//! let builder = MetricBuilder::new(&config.influxdb.measurement, &config.influxdb.probe_name);
//! let mut pipeline = Pipeline::new(builder, &config.influxdb.database, client)
//!     .with_notifier(pingflux::notify::from_env());
//!
//! let command = ProbeCommand::from_options(&config.options, &config.hosts.hosts);
//! let stats = ProbeRunner::new(&command).run(&mut pipeline).await?;
//! println!("{} points written", stats.written);
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod metric;
pub mod notify;
pub mod pipeline;
pub mod probe;
pub mod sink;

pub use config::{AppConfig, ConfigError, InfluxConfig, ProbeOptions};
pub use error::{Error, ErrorClass};
pub use metric::{MetricBuilder, MetricPoint, OnParseError, PointBatch};
pub use notify::{NoopNotifier, ReadinessNotifier, SystemdNotifier};
pub use pipeline::{MalformedLinePolicy, Pipeline, PipelineStats};
pub use probe::{FpingSummaryGrammar, LineGrammar, ProbeCommand, ProbeRunner, ProbeSample};
pub use sink::{InfluxClient, MetricSink, SinkError};
