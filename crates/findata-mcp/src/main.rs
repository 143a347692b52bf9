//! findata MCP Server - Financial Data via Model Context Protocol
//!
//! # Usage
//!
//! ## stdio transport (desktop MCP clients, local use)
//! ```bash
//! findata-mcp-server --seed sample
//! findata-mcp-server --config findata.toml
//! ```
//!
//! ## HTTP transport (for remote hosting)
//! ```bash
//! findata-mcp-server --http --port 8000 --seed generated
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use findata_mcp::bootstrap;
use findata_mcp::server::FindataMcpServer;
use findata_store::SeedMode;

/// findata MCP Server - Financial Data Queries
#[derive(Parser, Debug)]
#[command(name = "findata-mcp-server")]
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

    /// Use HTTP transport instead of stdio (for remote hosting)
    #[arg(long)]
    http: bool,

    /// HTTP port (only used with --http; defaults to settings)
    #[arg(short, long)]
    port: Option<u16>,

    /// HTTP host to bind to (only used with --http; defaults to settings)
    #[arg(long)]
    host: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = bootstrap::load_settings(args.config.as_deref(), args.database.as_deref())?;

    let filter = bootstrap::env_filter(&settings, args.verbose);

    // Only log to stderr for stdio transport to avoid corrupting the protocol
    if args.http {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!(
        "Starting {} v{} ({})",
        settings.server_name,
        settings.server_version,
        settings.app_env
    );
    let dispatcher = bootstrap::dispatcher(&settings, args.seed)?;
    let server = FindataMcpServer::new(dispatcher)
        .with_identity(settings.server_name.clone(), settings.server_version.clone());

    if args.http {
        let host = args.host.unwrap_or_else(|| settings.host.clone());
        let port = args.port.unwrap_or(settings.port);
        run_http_server(server, &host, port).await
    } else {
        run_stdio_server(server).await
    }
}

/// Run the server with stdio transport
async fn run_stdio_server(server: FindataMcpServer) -> anyhow::Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    tracing::info!("Using stdio transport");

    let service = server.serve(stdio()).await?;

    tracing::info!(
        "findata MCP Server ready with tools: {}",
        findata_core::tools::tool_names().join(", ")
    );

    service.waiting().await?;

    Ok(())
}

/// Run the server with HTTP transport (for remote hosting)
#[cfg(feature = "http")]
async fn run_http_server(server: FindataMcpServer, host: &str, port: u16) -> anyhow::Result<()> {
    use axum::Router;
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpService,
    };
    use tower_http::cors::{Any, CorsLayer};

    tracing::info!("Using HTTP transport on {}:{}", host, port);

    // Every session clones the same dispatcher; rate-limit windows span sessions.
    let mcp_service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .nest_service("/mcp", mcp_service)
        .route("/health", axum::routing::get(health_check))
        .layer(cors);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("findata MCP Server listening on http://{}/mcp", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for CTRL+C: {}", err);
            }
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}

/// Health check endpoint for HTTP transport
#[cfg(feature = "http")]
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": findata_mcp::SERVER_VERSION,
        "transport": "streamable-http",
    }))
}

/// Fallback when HTTP feature is not enabled
#[cfg(not(feature = "http"))]
async fn run_http_server(_server: FindataMcpServer, _host: &str, _port: u16) -> anyhow::Result<()> {
    anyhow::bail!("HTTP transport not available. Rebuild with: cargo build --features http")
}
