use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use authtunnel::config;
use authtunnel::ProxyServer;

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = authtunnel::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let mut config = config::load_config(&cli.config).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        anyhow::anyhow!(e)
    })?;

    // CLI --port overrides config
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    info!(
        "Configuration loaded: {} downstream(s), public URL {}",
        config.downstreams.len(),
        config.server.public_url
    );
    for ds in &config.downstreams {
        info!(
            name = %ds.name,
            strategy = ?ds.strategy,
            downstream_url = %ds.downstream_url,
            "Downstream configured"
        );
    }

    let server = ProxyServer::new(&config).map_err(|e| {
        error!("Failed to initialize server: {}", e);
        anyhow::anyhow!(e)
    })?;

    server.run().await.map_err(|e| {
        error!("Server error: {}", e);
        anyhow::anyhow!(e)
    })?;

    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the CLI flag.
fn init_logging(log_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
