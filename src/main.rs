//! pingflux Binary Entry Point
//!
//! Runs fping once against the configured hosts and ships every per-host
//! summary to InfluxDB. The process ends when fping does; a supervisor is
//! expected to restart it.

use std::process::ExitCode;

use clap::Parser;
use pingflux::{
    AppConfig, Error, InfluxClient, MetricBuilder, Pipeline, PipelineStats, ProbeCommand,
    ProbeRunner, config::DEFAULT_CONFIG_PATH,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// pingflux - fping to InfluxDB bridge
#[derive(Parser, Debug)]
#[command(name = "pingflux", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (.toml or .yaml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "PINGFLUX_CONFIG")]
    config: String,

    /// InfluxDB address (overrides config file)
    #[arg(long, env = "PINGFLUX_INFLUX_ADDRESS")]
    influx_address: Option<String>,

    /// Probe executable (overrides config file)
    #[arg(long, env = "PINGFLUX_PROBE_BINARY")]
    probe_binary: Option<String>,

    /// Print the probe command line and exit
    #[arg(long)]
    print_command: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pingflux=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(stats) => {
            tracing::info!(
                lines = stats.lines,
                samples = stats.samples,
                skipped = stats.skipped,
                discarded = stats.discarded,
                written = stats.written,
                "Run complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            let class = e.class();
            tracing::error!(class = %class, error = %e, "Run failed");
            class.into()
        }
    }
}

async fn run(cli: Cli) -> Result<PipelineStats, Error> {
    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(address) = cli.influx_address {
        config.influxdb.address = address;
    }
    if let Some(binary) = cli.probe_binary {
        config.options.binary = binary.into();
    }
    config.validate()?;

    let command = ProbeCommand::from_options(&config.options, &config.hosts.hosts);
    if cli.print_command {
        println!("{}", command.display());
        return Ok(PipelineStats::default());
    }

    tracing::info!(
        address = %config.influxdb.address,
        username = %config.influxdb.username,
        database = %config.influxdb.database,
        "Connecting to InfluxDB"
    );
    let client = InfluxClient::new(&config.influxdb)?;
    client.ping().await?;

    let builder = MetricBuilder::new(&config.influxdb.measurement, &config.influxdb.probe_name)
        .with_parse_policy(config.options.on_parse_error);
    let mut pipeline = Pipeline::new(builder, &config.influxdb.database, client)
        .with_notifier(pingflux::notify::from_env())
        .with_malformed_line_policy(config.options.on_malformed_line);

    tracing::info!(
        hosts = config.hosts.hosts.len(),
        on_parse_error = %config.options.on_parse_error,
        on_malformed_line = %config.options.on_malformed_line,
        "Probe command: {}",
        command.display()
    );

    ProbeRunner::new(&command).run(&mut pipeline).await
}
