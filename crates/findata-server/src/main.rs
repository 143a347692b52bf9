//! findata REST server entry point.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use findata_mcp::bootstrap;
use findata_server::Server;
use findata_store::SeedMode;

/// findata REST debug server
#[derive(Parser, Debug)]
#[command(name = "findata-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides settings)
    #[arg(short, long)]
    database: Option<String>,

    /// Populate an empty database: sample or generated
    #[arg(long)]
    seed: Option<SeedMode>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = bootstrap::load_settings(args.config.as_deref(), args.database.as_deref())?;

    tracing_subscriber::registry()
        .with(bootstrap::env_filter(&settings, false))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "findata REST server v{} ({})",
        settings.server_version, settings.app_env
    );

    let dispatcher = bootstrap::dispatcher(&settings, args.seed)?;
    Server::new(settings, dispatcher).start().await?;

    Ok(())
}
