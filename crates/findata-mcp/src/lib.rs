//! # findata MCP Server
//!
//! Model Context Protocol (MCP) server for the findata financial-data
//! service.
//!
//! Exposes company search, profiles, financial statements, price history,
//! analyst consensus, screening and sector aggregates as MCP tools. Every
//! call returns the same JSON envelope and passes a per-tool rate limit.
//!
//! ## Quick Start
//!
//! ```bash
//! # stdio transport (desktop MCP clients)
//! findata-mcp-server --seed sample
//!
//! # streamable HTTP transport
//! findata-mcp-server --http --port 8000 --seed generated
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bootstrap;
pub mod dispatch;
pub mod server;

pub use dispatch::{Dispatched, ToolDispatcher};
pub use server::FindataMcpServer;

/// Server name for MCP protocol
pub const SERVER_NAME: &str = "financial-data-mcp";

/// Server version (same as crate version)
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
