//! Parley Node - storefront support messaging server.

use anyhow::Context;
use clap::Parser;
use parley_node::{
    api::{create_router, AppState},
    config::NodeConfig,
    observability::{init_logging, LogFormat},
};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Parley Node - support messaging over HTTP and WebSocket
#[derive(Parser, Debug)]
#[command(name = "parley-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// API listen address
    #[arg(long, env = "PARLEY_API_ADDR")]
    api_addr: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PARLEY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, env = "PARLEY_LOG_FORMAT")]
    log_format: Option<String>,

    /// Lifetime of realtime grants in seconds
    #[arg(long, env = "PARLEY_GRANT_TTL_SECS")]
    grant_ttl_secs: Option<u64>,
}

impl Args {
    /// Defaults, then the config file, then flags.
    fn resolve(self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => NodeConfig::default(),
        };

        if let Some(addr) = self.api_addr {
            config.api_addr = addr;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = LogFormat::parse(&format);
        }
        if let Some(ttl) = self.grant_ttl_secs {
            config.grant_ttl_secs = ttl;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Args::parse().resolve()?;

    init_logging(&config.log_level, config.log_format.is_json());

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Parley node");
    tracing::info!(
        api_addr = %config.api_addr,
        grant_ttl_secs = config.grant_ttl_secs,
        max_connections = config.max_connections,
        seed = config.seed.len(),
        "Node configuration"
    );

    let addr = config.api_addr;
    let state = AppState::new(config);
    let seeded = state.seed().context("seeding customers")?;
    tracing::info!(count = seeded.len(), "Seed customers registered");

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    tracing::info!(addr = %addr, "Node is ready. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Parley node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
