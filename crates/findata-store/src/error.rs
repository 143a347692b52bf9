//! Store error types.

use findata_core::FindataError;
use thiserror::Error;

/// A specialized Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite reported an error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No pooled connection could be obtained.
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    /// A blocking task panicked or was cancelled.
    #[error("blocking task failed: {reason}")]
    Task {
        /// Description of the failure.
        reason: String,
    },

    /// A migration failed to apply.
    #[error("migration {version} failed: {reason}")]
    Migration {
        /// Migration version.
        version: &'static str,
        /// Underlying error.
        reason: String,
    },

    /// Seeding sample data failed.
    #[error("seed failed: {reason}")]
    Seed {
        /// Description of the failure.
        reason: String,
    },

    /// The database file could not be prepared.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A caller-facing lookup or validation failure.
    #[error(transparent)]
    Query(#[from] FindataError),
}

impl StoreError {
    /// Creates a seed error.
    #[must_use]
    pub fn seed(reason: impl Into<String>) -> Self {
        Self::Seed {
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for FindataError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Query(inner) => inner,
            other => FindataError::storage(other.to_string()),
        }
    }
}
