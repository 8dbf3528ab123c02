//! Shutdown manager (v1)
//!
//! Runs the configured HTTP listeners under one shutdown manager.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml ──▶ config (load + validate)
//!                        │
//!                        ▼
//!   ┌──────────────────────────────────────────────────────────┐
//!   │                    lifecycle::Manager                     │
//!   │                                                           │
//!   │   run(token) ──▶ serve every server (shared group token)  │
//!   │        │                                                  │
//!   │        ├── SIGINT / SIGTERM ──┐                           │
//!   │        ├── server failure ────┼──▶ stop()                 │
//!   │        └── all servers exit ──┘      │                    │
//!   │                                      ▼                    │
//!   │            graceful_stop(deadline) ─▶ force_stop()        │
//!   └──────────────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!   observability (tracing to stderr, Prometheus counters)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use shutdown_manager::config::{load_config, AppConfig};
use shutdown_manager::http::{status_router, HttpServer};
use shutdown_manager::lifecycle::{Manager, ManagerConfig};
use shutdown_manager::observability::{logging, metrics, PrometheusMetrics};

#[derive(Parser)]
#[command(name = "shutdown-manager")]
#[command(about = "Run HTTP listeners with coordinated graceful shutdown", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config.as_deref().map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("shutdown-manager v{} starting", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Exiting with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut manager_config = ManagerConfig::from_settings(&config.shutdown);

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
        manager_config = manager_config.with_metrics(Arc::new(PrometheusMetrics));
    }

    let mut manager = Manager::new(manager_config);
    for listener in &config.http {
        let server = HttpServer::bind(listener, status_router(&listener.name)).await?;
        manager.add(Arc::new(server));
    }

    tracing::info!(
        shutdown_timeout = ?manager.config().shutdown_timeout(),
        handle_signals = manager.config().handle_signals(),
        listeners = manager.len(),
        "Configuration loaded"
    );

    if manager.is_empty() {
        tracing::warn!("No servers configured; nothing to run");
    }

    manager.run(CancellationToken::new()).await?;
    Ok(())
}
