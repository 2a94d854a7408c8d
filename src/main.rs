//! Demo server for the request telemetry pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request-id ─▶ timeout ─▶ caller role
//!                                                  │
//!                     ┌────────────────────────────┘
//!                     ▼
//!                collector ─▶ tracker ─▶ analyzer ─▶ demo handler
//!                    │           │           │
//!                    ▼           ▼           ▼
//!              logger/store  X-Progress   MetricsRegistry ─▶ /_telemetry/*
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use request_telemetry::collector::TrackingAllocator;
use request_telemetry::config::{load_config, TelemetryConfig};
use request_telemetry::lifecycle::{wait_for_signal, Shutdown};
use request_telemetry::observability;
use request_telemetry::TelemetryServer;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

#[derive(Parser)]
#[command(name = "request-telemetry")]
#[command(about = "Demo server instrumented with request telemetry", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TelemetryConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    observability::logging::init(&config.observability);

    tracing::info!("request-telemetry v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        collector = config.collector.enabled,
        tracker = config.tracker.enabled,
        analyzer = config.analyzer.enabled,
        sample_rate = config.analyzer.sample_rate,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = TelemetryServer::new(config);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal(&shutdown).await;
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
