//! HeartSync - headless heart telemetry client
//!
//! Connects to the metrics service, keeps a local render state in sync with
//! it, and relays intensity values typed on stdin back to the service.

mod consumer;
mod input;
mod logging_setup;

use anyhow::{Context, Result};
use clap::Parser;
use consumer::HeadlessConsumer;
use heartsync_control::TelemetryClient;
use heartsync_core::{ClientConfig, Transport};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Command-line options. Anything given here overrides the config file.
#[derive(Parser, Debug)]
#[command(name = "heartsync", about = "Headless heart telemetry client", version)]
struct Cli {
    /// Config file (default: <config dir>/HeartSync/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ingestion transport: stream or poll
    #[arg(short, long)]
    transport: Option<Transport>,

    #[arg(long)]
    stream_url: Option<String>,

    #[arg(long)]
    metrics_url: Option<String>,

    /// Base URL for intensity commands
    #[arg(long)]
    command_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(ClientConfig::default_path)
    }

    fn apply(&self, config: &mut ClientConfig) {
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(url) = &self.stream_url {
            config.stream_url = url.clone();
        }
        if let Some(url) = &self.metrics_url {
            config.metrics_url = url.clone();
        }
        if let Some(url) = &self.command_url {
            config.command_url = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let path = cli.config_path();
    let mut config = ClientConfig::load(&path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if cli.write_config {
        let path = cli.config_path();
        config
            .save(&path)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let _log_guard = logging_setup::init(&config.log)?;

    info!("=== HeartSync session started ===");
    info!(
        transport = %config.transport,
        stream_url = %config.stream_url,
        metrics_url = %config.metrics_url,
        command_url = %config.command_url,
        "Configuration loaded"
    );

    let mut client = TelemetryClient::new(config).context("Failed to create telemetry client")?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        client.runtime_handle().spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
                running.store(false, Ordering::SeqCst);
            }
        });
    }

    let input = match input::spawn_stdin_reader() {
        Ok(rx) => Some(rx),
        Err(e) => {
            warn!("Stdin unavailable, intensity input disabled: {}", e);
            None
        }
    };

    client.start().context("Failed to start ingestion")?;
    println!("Type an intensity between 0 and 1 and press Enter; `q` quits.");

    let mut consumer = HeadlessConsumer::new(client, input, running)?;
    consumer.run();
    consumer.shutdown();

    info!("=== HeartSync session ended ===");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "heartsync",
            "--transport",
            "poll",
            "--metrics-url",
            "http://sim:9000/metrics",
            "--log-level",
            "debug",
        ]);
        let mut config = ClientConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.transport, Transport::Poll);
        assert_eq!(config.metrics_url, "http://sim:9000/metrics");
        assert_eq!(config.log.level, "debug");
        // Untouched fields keep their values
        assert_eq!(config.stream_url, ClientConfig::default().stream_url);
    }

    #[test]
    fn test_cli_rejects_unknown_transport() {
        assert!(Cli::try_parse_from(["heartsync", "--transport", "carrier-pigeon"]).is_err());
    }

    #[test]
    fn test_load_config_from_file_then_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval_ms = 250\ntransport = \"poll\"\n").unwrap();

        let cli = Cli::parse_from([
            "heartsync",
            "--config",
            path.to_str().unwrap(),
            "--transport",
            "stream",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.transport, Transport::Stream);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_config_rejects_invalid_override() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from([
            "heartsync",
            "--config",
            dir.path().join("missing.toml").to_str().unwrap(),
            "--command-url",
            " ",
        ]);
        assert!(load_config(&cli).is_err());
    }
}
