//! Handle Daemon - persistent identifier registry over HTTP
//!
//! The handle daemon provides:
//! - Resolution of handles and individual values
//! - Create-or-replace with `If-Match` / `If-None-Match`
//! - Partial modification that never removes the last admin value
//! - Batch creation with generated names

use clap::Parser;
use handle_daemon::{DaemonConfig, DaemonError, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Handle Daemon CLI
#[derive(Parser)]
#[command(name = "handled")]
#[command(about = "Handle Daemon - persistent identifier registry over HTTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "HANDLE_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides the configuration file
    #[arg(short, long, env = "HANDLE_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level
    #[arg(long, env = "HANDLE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "HANDLE_LOG_JSON")]
    json: bool,

    /// Handle of the administrator written into synthesized admin values
    #[arg(long, env = "HANDLE_ADMIN_HANDLE")]
    admin_handle: Option<String>,

    /// Index of the administrator's key value
    #[arg(long, env = "HANDLE_ADMIN_KEY_INDEX")]
    admin_key_index: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }
    if let Some(handle) = cli.admin_handle {
        config.admin.handle = handle;
    }
    if let Some(index) = cli.admin_key_index {
        config.admin.key_index = index;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        "Starting handle daemon"
    );

    let server = Server::new(config)?;
    server.run().await?;
    Ok(())
}
