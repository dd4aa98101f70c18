//! SkyWatch server - HTTP API for sky event sighting reports

use clap::Parser;
use skywatch::config::SkywatchConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "skywatch")]
#[command(version)]
#[command(about = "SkyWatch - submit and browse sightings of meteors, satellites and other sky events")]
#[command(long_about = r#"
SkyWatch serves a small JSON API:
  GET  /health              liveness check
  POST /reports             submit a sighting
  GET  /reports?limit=N     most recent sightings first

Example usage:
  skywatch --config skywatch.toml
  SKYWATCH_DATABASE=/srv/skywatch.db skywatch --bind 0.0.0.0:8000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the config file (defaults to skywatch.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides config and environment)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let mut config = SkywatchConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database.path = database;
    }
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    tracing::debug!(?config, "Loaded configuration");
    skywatch::server::start_server(config).await
}
