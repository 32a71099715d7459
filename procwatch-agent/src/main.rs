//! ProcWatch Agent - process presence reporter
//!
//! Runs on each monitored host:
//! - Reads `config.txt` (collector URL + process names)
//! - Every cycle checks whether each named process is running
//! - Sends one status report per process to the collector, best effort

mod config;
mod probe;
mod reporter;
mod transport;

use anyhow::{Context, Result};
use config::{AgentConfig, Loaded};
use probe::SysinfoProbe;
use reporter::Reporter;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use transport::HttpSender;

#[tokio::main]
async fn main() -> Result<()> {
    // .env may set RUST_LOG / PROCWATCH_AGENT_CONFIG
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("ProcWatch Agent v{} starting...", env!("CARGO_PKG_VERSION"));

    let path = AgentConfig::default_path();
    let config = match AgentConfig::load(&path) {
        Ok(Loaded::Ready(config)) => config,
        Ok(Loaded::CreatedDefault(path)) => {
            warn!("Created {} with default values, edit it and restart the agent", path.display());
            return Ok(());
        }
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let sender = HttpSender::new(&config.master_server_url).context("Failed to create HTTP client")?;
    let reporter = Reporter::new(SysinfoProbe, sender, config.process_names.clone(), config.interval)
        .with_local_ip(transport::local_address());

    info!("Reporting to {}", config.master_server_url);

    // background reporting task; the foreground only waits for shutdown
    let reporting = tokio::spawn(reporter.run());

    tokio::signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
    reporting.abort();
    info!("Agent stopped");
    Ok(())
}
