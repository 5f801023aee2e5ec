//! Weather alert poller.
//!
//! Fetches CAP alert bulletins on a schedule with:
//! - Single-flight polling (overlapping ticks are skipped)
//! - Last good alert set kept when a cycle fails
//! - Built-in sample data when no API key is configured
//! - HTTP API for alerts, map layers and status

use std::path::PathBuf;
use std::sync::Arc;

use alert_poller::{AlertStore, PollerConfig, Scheduler, ServerState};
use anyhow::{Context, Result};
use clap::Parser;
use ingestion::{AlertSource, HttpAlertSource, IngestionPipeline, MockAlertSource};
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "alert-poller")]
#[command(about = "Weather alert poller with in-memory alert store")]
struct Args {
    /// Run a single ingestion cycle and exit
    #[arg(long)]
    once: bool,

    /// YAML configuration file
    #[arg(short, long, env = "POLLER_CONFIG")]
    config: Option<PathBuf>,

    /// AEMET OpenData API key
    #[arg(long, env = "AEMET_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Use built-in sample alerts instead of the upstream API
    #[arg(long)]
    mock: bool,

    /// Polling interval in seconds (overrides config)
    #[arg(long)]
    poll_interval_secs: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Port for the HTTP API (overrides config)
    #[arg(long, env = "POLLER_PORT")]
    port: Option<u16>,

    /// Disable the HTTP API
    #[arg(long)]
    no_server: bool,
}

fn build_source(args: &Args, config: &PollerConfig) -> Result<Arc<dyn AlertSource>> {
    let api_key = args
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty());

    match api_key {
        Some(key) if !args.mock => {
            let source = HttpAlertSource::new(config.source_config(key))
                .context("Failed to create HTTP alert source")?;
            Ok(Arc::new(source))
        }
        Some(_) => {
            info!("Mock mode requested, ignoring API key");
            Ok(Arc::new(MockAlertSource::new()))
        }
        None => {
            if !args.mock {
                warn!("No API key configured, using built-in sample alerts");
            }
            Ok(Arc::new(MockAlertSource::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    info!("Starting weather alert poller");

    let mut config = PollerConfig::load_or_default(args.config.as_deref())?;
    if let Some(secs) = args.poll_interval_secs {
        config.schedule.poll_interval_secs = secs;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let source = build_source(&args, &config)?;
    let source_name = source.name().to_string();
    let pipeline = IngestionPipeline::new(source);
    let cycle_state = pipeline.subscribe_state();

    let store = Arc::new(AlertStore::new(config.schedule.history_size));
    let scheduler = Arc::new(Scheduler::new(pipeline, store.clone(), config.poll_interval()));

    let server_state = Arc::new(ServerState {
        store: store.clone(),
        cycle_state,
        source_name: source_name.clone(),
        poll_interval_secs: config.schedule.poll_interval_secs,
        prometheus: Some(prometheus_handle),
    });

    // Shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start API server (unless disabled or in --once mode)
    if config.server.enabled && !args.no_server && !args.once {
        let port = config.server.port;
        tokio::spawn(async move {
            if let Err(e) = alert_poller::run_server(server_state, port).await {
                tracing::error!(error = %e, "API server failed");
            }
        });
    }

    if args.once {
        info!(source = %source_name, "Running single ingestion cycle");

        if let Some(record) = scheduler.tick().await {
            info!(
                status = ?record.status,
                alerts = record.alerts,
                files = record.files_total,
                files_failed = record.files_failed.len(),
                duration_ms = record.duration_ms,
                error = record.error_message.as_deref().unwrap_or(""),
                "Ingestion cycle finished"
            );
        }
    } else {
        // Handle Ctrl+C
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            shutdown_tx_clone.send(()).ok();
        });

        scheduler.run_forever(shutdown_tx.subscribe()).await;
    }

    info!(
        alerts = store.snapshot().alerts.len(),
        "Alert poller stopped"
    );

    Ok(())
}
