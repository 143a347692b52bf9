//! Error types for findata.
//!
//! Tool-facing failures (bad input, unknown tickers, missing reports) carry an
//! [`ErrorCode`] so the dispatch layer can turn them into response envelopes.
//! Everything else is an internal failure that propagates to the transport.

use thiserror::Error;

use crate::envelope::ErrorCode;

/// A specialized Result type for findata operations.
pub type FindataResult<T> = Result<T, FindataError>;

/// The main error type for findata operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FindataError {
    /// Caller-supplied arguments failed a local check.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of what is wrong with the input.
        message: String,
    },

    /// A ticker did not resolve to a visible company.
    #[error("No company found for ticker '{ticker}'")]
    TickerNotFound {
        /// The ticker as supplied by the caller.
        ticker: String,
    },

    /// A more specific lookup (a report year or quarter, a sector) is absent.
    #[error("Not found: {message}")]
    NotFound {
        /// Description of the missing resource.
        message: String,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of the configuration error.
        reason: String,
    },

    /// The relational store failed.
    #[error("Storage error: {reason}")]
    Storage {
        /// Description of the storage failure.
        reason: String,
    },

    /// Anything else.
    #[error("Internal error: {reason}")]
    Internal {
        /// Description of the failure.
        reason: String,
    },
}

impl FindataError {
    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a ticker-not-found error.
    #[must_use]
    pub fn ticker_not_found(ticker: impl Into<String>) -> Self {
        Self::TickerNotFound {
            ticker: ticker.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// The envelope error code for tool-facing failures.
    ///
    /// Returns `None` for internal failures, which are not reported through
    /// the envelope by the dispatch layer.
    #[must_use]
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::InvalidInput { .. } => Some(ErrorCode::InvalidInput),
            Self::TickerNotFound { .. } => Some(ErrorCode::TickerNotFound),
            Self::NotFound { .. } => Some(ErrorCode::NotFound),
            Self::Config { .. } | Self::Storage { .. } | Self::Internal { .. } => None,
        }
    }

    /// Message shown to the caller in the envelope.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput { message } | Self::NotFound { message } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Optional hint shown alongside the message.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::TickerNotFound { .. } => Some(
                "Check spelling or use search_companies to find valid tickers.".to_string(),
            ),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FindataError {
    fn from(e: std::io::Error) -> Self {
        FindataError::Internal {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for FindataError {
    fn from(e: serde_json::Error) -> Self {
        FindataError::Internal {
            reason: format!("serialization failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            FindataError::invalid_input("x").error_code(),
            Some(ErrorCode::InvalidInput)
        );
        assert_eq!(
            FindataError::ticker_not_found("ZZZZ").error_code(),
            Some(ErrorCode::TickerNotFound)
        );
        assert_eq!(
            FindataError::not_found("2019 report").error_code(),
            Some(ErrorCode::NotFound)
        );
        assert_eq!(FindataError::storage("disk").error_code(), None);
    }

    #[test]
    fn test_ticker_not_found_message() {
        let err = FindataError::ticker_not_found("ZZZZ");
        assert!(err.user_message().contains("ZZZZ"));
        assert!(err.hint().unwrap().contains("search_companies"));
    }
}
