//! # findata Core
//!
//! Core types and algorithms for the findata financial-data query service.
//!
//! - **Metrics**: CAGR, simple and total return, max drawdown
//! - **Rate limiting**: per-tool sliding-window admission control
//! - **Pagination**: opaque keyset cursors and page truncation
//! - **Envelope**: the uniform `ToolResponse` returned by every tool
//! - **Tools**: the tool catalog and typed, validated requests
//!
//! ## Example
//!
//! ```rust
//! use findata_core::prelude::*;
//!
//! let limiter = RateLimiter::default();
//! let policy = ToolName::CompareCompanies.rate_limit(&RateLimitConfig::default());
//! assert!(limiter.check_policy("compare_companies", policy).allowed);
//!
//! assert_eq!(max_drawdown(&[100.0, 120.0, 90.0, 110.0]), Some(-0.25));
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod config;
pub mod cursor;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod request;
pub mod tools;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{RateLimitConfig, Settings};
    pub use crate::cursor::{paginate, Page};
    pub use crate::envelope::{ErrorCode, ErrorDetail, Meta, ToolResponse};
    pub use crate::error::{FindataError, FindataResult};
    pub use crate::metrics::{cagr, max_drawdown, simple_return, total_return};
    pub use crate::rate_limit::{RateDecision, RateLimitPolicy, RateLimiter};
    pub use crate::request::{Arguments, ToolRequest};
    pub use crate::tools::{catalog, CompareMetric, ToolDefinition, ToolName};
}

pub use error::{FindataError, FindataResult};
