//! cdc-firefighter HTTP gateway
//!
//! Usage:
//!   cdc-firefighter
//!   cdc-firefighter --bind 0.0.0.0:8000 --config ./firefighter.toml

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use cdc_firefighter::{config::Config, http::start_http_server, server::Gateway};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "cdc-firefighter")]
#[command(about = "Monitoring assistant for the CDC pipeline (MCP tools + Gemini)", long_about = None)]
struct Cli {
    /// Address to listen on, overrides FIREFIGHTER_HTTP_BIND
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// TOML configuration file, overrides FIREFIGHTER_CONFIG
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_from(cli.config.as_deref()).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    if let Some(bind) = cli.bind {
        config.runtime.http_bind = bind;
    }

    tracing_subscriber::fmt()
        .with_env_filter(config.runtime.log_level.as_str())
        .init();

    info!(
        "Starting cdc-firefighter (mcp={}, model={})",
        config.mcp.server_url, config.synthesis.model
    );

    let gateway = Gateway::new(&config).map_err(|e| {
        eprintln!("Failed to create gateway: {}", e);
        e
    })?;

    start_http_server(gateway, config.runtime.http_bind).await?;

    Ok(())
}
