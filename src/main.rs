//! Prometheus exporter for Klipper printers via the Moonraker API.

use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use moonraker_exporter::config::LogFormat;
use moonraker_exporter::{AppState, ExporterConfig, HttpClient, HttpServer, KNOWN_MODULES};

/// Prometheus exporter for Klipper printers.
#[derive(Parser, Debug)]
#[command(name = "moonraker-exporter")]
#[command(about = "Export Moonraker/Klipper printer telemetry as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Default Moonraker target (overrides config).
    #[arg(long)]
    target: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // CLI overrides
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(target) = args.target {
        config.moonraker.default_target = Some(target);
    }

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("moonraker_exporter={}", log_level).parse()?);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!("Starting Moonraker exporter");

    let unknown: Vec<&String> = config
        .modules
        .iter()
        .filter(|m| !KNOWN_MODULES.contains(&m.as_str()))
        .collect();
    if !unknown.is_empty() {
        warn!(?unknown, "ignoring unrecognized modules in configuration");
    }

    let listen_addr = config
        .server
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    // Create components
    let client = HttpClient::new(Duration::from_secs(config.moonraker.timeout_secs))?;
    let state = AppState::new(
        client,
        config.moonraker.default_target.clone(),
        config.modules.clone(),
    );
    let http_server = HttpServer::new(state.clone(), listen_addr, config.server.path.clone());

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start HTTP server
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).unwrap();
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for the server to drain
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    // Print final stats
    let stats = state.stats();
    info!(
        scrapes = stats.scrapes,
        scrapes_rejected = stats.scrapes_rejected,
        samples_emitted = stats.samples_emitted,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
