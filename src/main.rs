//! radix-router server.
//!
//! Serves the stub routes declared in a TOML config through the radix-tree
//! routing engine.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  radix-router                     │
//!                     │                                                   │
//!  Client Request     │  ┌─────────┐   ┌─────────┐   ┌───────────────┐   │
//!  ───────────────────┼─▶│  http   │──▶│ routing │──▶│   dispatch    │   │
//!                     │  │ server  │   │  cache  │   │ handler chain │   │
//!                     │  └─────────┘   │  + tree │   └───────┬───────┘   │
//!                     │                └─────────┘           │           │
//!  Client Response    │                                      ▼           │
//!  ◀──────────────────┼──────────────────────────────── Response          │
//!                     │                                                   │
//!                     │  ┌─────────┐ ┌──────────────┐ ┌───────────────┐  │
//!                     │  │ config  │ │observability │ │   lifecycle   │  │
//!                     │  │ +watch  │ │ logs/metrics │ │startup/shutdown│ │
//!                     │  └─────────┘ └──────────────┘ └───────────────┘  │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use radix_router::config::{load_config, AppConfig, ConfigWatcher};
use radix_router::http::HttpServer;
use radix_router::lifecycle::{shutdown_signal, Shutdown};
use radix_router::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "radix-router")]
#[command(about = "HTTP server backed by a radix-tree router", long_about = None)]
struct Args {
    /// Path to the TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload routes when the configuration file changes
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "radix-router starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher stops when its handle is dropped, so keep it for the whole run
    let (config_updates, _watcher) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
