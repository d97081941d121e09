//! Plugin gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ routing ──▶ Context ──▶ request plugins
//!                                                                 │
//!                                                                 ▼
//!     Client Response                                          dispatch ──▶ Upstream
//!     ◀────────────── BufferedWriter ◀── finish ◀── response plugins ◀── ingest
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use plugin_gateway::config::{self, GatewayConfig};
use plugin_gateway::lifecycle::{spawn_signal_handler, Shutdown};
use plugin_gateway::observability::{init_logging, metrics};
use plugin_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "plugin-gateway")]
#[command(about = "Plugin-driven API gateway", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "plugin-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        apis = config.apis.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = GatewayServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
