use anyhow::Result;
use bounty_platform::{api::start_api_server, config::Config};
use clap::Parser;
use log::info;
use std::path::PathBuf;

/// API Server Arguments
#[derive(Parser)]
#[clap(name = "api-server")]
#[clap(about = "Bounty Platform API server")]
struct Args {
    /// Path to a TOML config file (defaults to platform.toml when present)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Address to bind, overrides HOST
    #[clap(long)]
    host: Option<String>,

    /// Port to listen on, overrides PORT
    #[clap(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!(
        "Starting Bounty Platform API {} on {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.server.host,
        config.server.port
    );

    start_api_server(config).await
}
