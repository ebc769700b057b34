//! Cart service with request instrumentation (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http server ──▶ instrumentation ──▶ handlers ──▶ cart store
//!                        │              │     │                          ▲
//!                        │          spans   counter/histogram            │ snapshot
//!                        │              ▼     ▼                          │
//!                        │          SpanQueue  MetricRegistry ◀── cart_items_count gauge
//!                        │              │     │
//!                        │              ▼     ▼
//!                        │          ExportScheduler (every interval)
//!                        │                 │
//!                        │                 ▼
//!                        │          TelemetrySink (http / log)
//!                        │
//!     Prometheus scrape ─┴─▶ pipeline self-metrics (optional)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use cart_telemetry::config::load_config;
use cart_telemetry::lifecycle::{wait_for_signal, Services, Shutdown, StartupError};
use cart_telemetry::observability::{logging, metrics};
use cart_telemetry::HttpServer;

#[derive(Parser)]
#[command(name = "cart-telemetry")]
#[command(about = "Cart service with request instrumentation and telemetry export", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration, print it as TOML and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    if cli.check_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cart-telemetry starting");
    tracing::info!(
        service = %config.service.name,
        environment = %config.service.environment,
        bind_address = %config.listener.bind_address,
        exporter = ?config.exporter.kind,
        endpoint = %config.exporter.endpoint,
        insecure = config.exporter.insecure,
        interval_secs = config.exporter.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation guarantees the address parses.
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr).map_err(StartupError::from)?;
    }

    let services = Services::init(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let exporter_shutdown = Shutdown::new();
    let exporter = services
        .export_scheduler(&config.exporter)
        .spawn(exporter_shutdown.subscribe());

    let server_shutdown = Shutdown::new();
    let server = HttpServer::new(&config, &services);
    let mut server_task = tokio::spawn(server.run(listener, server_shutdown.subscribe()));

    tokio::select! {
        _ = wait_for_signal() => {
            server_shutdown.trigger();
            server_task.await??;
        }
        result = &mut server_task => {
            tracing::error!("HTTP server exited before a shutdown signal");
            result??;
        }
    }

    tracing::info!("Flushing telemetry");
    exporter_shutdown.trigger();
    exporter.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
