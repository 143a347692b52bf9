//! # findata Server
//!
//! REST debug server for the findata tools.
//!
//! ## Features
//!
//! - `POST /tools/{name}` runs a tool and returns its envelope with a
//!   matching HTTP status
//! - Tool catalog, health check, OpenAPI document, Swagger UI and ReDoc
//! - Security headers, request IDs and configurable CORS
//!
//! ## Usage
//!
//! ```ignore
//! use findata_server::Server;
//!
//! let server = Server::new(settings, dispatcher);
//! server.start().await?;
//! ```

#![warn(clippy::all)]

pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod security;

use std::sync::Arc;

use axum::middleware;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use findata_core::config::Settings;
use findata_mcp::ToolDispatcher;

use crate::handlers::AppState;
use crate::security::SecurityConfig;

/// The findata REST server.
pub struct Server {
    settings: Settings,
    dispatcher: Arc<ToolDispatcher>,
}

impl Server {
    /// Create a new server.
    pub fn new(settings: Settings, dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            settings,
            dispatcher,
        }
    }

    fn server_url(&self) -> String {
        format!("http://{}:{}", self.settings.host, self.settings.port)
    }

    /// Build the router with tracing, security headers and CORS.
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            dispatcher: self.dispatcher.clone(),
            settings: self.settings.clone(),
            openapi: openapi::document(&self.settings, &self.server_url()),
        });
        let security = SecurityConfig {
            headers_enabled: self.settings.enable_security_headers,
        };

        routes::create_router(state)
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn_with_state(security, security::security_headers))
            .layer(security::cors_layer(&self.settings.cors_origins()))
    }

    /// Bind the configured host, which may be a name or an address.
    pub async fn bind(&self) -> Result<TcpListener, std::io::Error> {
        TcpListener::bind((self.settings.host.as_str(), self.settings.port)).await
    }

    /// Start the server and run until CTRL+C.
    pub async fn start(&self) -> Result<(), std::io::Error> {
        let listener = self.bind().await?;
        let addr = listener.local_addr()?;

        info!("Starting findata REST server on {}", addr);
        info!("API docs: http://{}/docs", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for CTRL+C: {}", err);
    }
    info!("Shutdown signal received");
}
