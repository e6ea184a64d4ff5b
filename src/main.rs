//! Multi-site request router service.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────────────┐
//!                    │                     SITE ROUTER                        │
//!                    │                                                        │
//!   Client Request   │  ┌─────────┐    ┌──────────────┐    ┌──────────────┐   │
//!   ─────────────────┼─▶│  http   │───▶│    sites     │───▶│   routing    │   │
//!                    │  │ server  │    │   resolver   │    │   pipeline   │   │
//!                    │  └─────────┘    └──────────────┘    └──────┬───────┘   │
//!                    │                                            │           │
//!                    │                                            ▼           │
//!   JSON Resolution  │  ┌─────────┐                     ┌──────────────────┐  │
//!   ◀────────────────┼──│response │◀────────────────────│ lookup (tokens,  │  │
//!                    │  │ mapping │                     │ elements, tmpls) │  │
//!                    │  └─────────┘                     └──────────────────┘  │
//!                    │                                                        │
//!                    │  Cross-cutting: config + watcher, observability,       │
//!                    │  lifecycle (signals, shutdown)                         │
//!                    └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use site_router::config::load_config;
use site_router::config::watcher::ConfigWatcher;
use site_router::lifecycle::{spawn_signal_handler, Shutdown};
use site_router::observability::{init_logging, init_metrics};
use site_router::{Collaborators, HttpServer, Router};

#[derive(Parser)]
#[command(name = "site-router")]
#[command(about = "Resolves requests to sites and application routes", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "router.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    init_logging(&config.observability)?;
    tracing::info!("site-router v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        sites = config.sites.len(),
        rules = config.rules.len(),
        cp_rules = config.cp_rules.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let collaborators = Collaborators::from_config(&config);
    let router = Arc::new(Router::new(config, collaborators));
    router.init()?;

    let (watcher, config_updates) = ConfigWatcher::new(&args.config);
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            None
        }
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(router);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
