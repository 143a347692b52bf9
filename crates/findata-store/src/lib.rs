//! # findata Store
//!
//! SQLite-backed relational store for the findata service.
//!
//! - [`db::Database`]: r2d2 connection pool, migrations, blocking-task bridge
//! - [`access::UserContext`]: row visibility applied to every company lookup
//! - Query services: [`companies`], [`financials`], [`compare`], [`stocks`],
//!   [`analysts`], [`sectors`]
//! - [`seed`]: deterministic sample data
//!
//! Query services are synchronous functions over a `&Connection`; async
//! callers run them through [`db::Database::run`].

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod access;
pub mod analysts;
pub mod companies;
pub mod compare;
pub mod db;
pub mod error;
pub mod financials;
pub mod schema;
pub mod sectors;
pub mod seed;
pub mod stocks;

pub use access::{Role, UserContext};
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use seed::SeedMode;
