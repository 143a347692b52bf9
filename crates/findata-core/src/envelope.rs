//! Uniform response envelope returned by every tool.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FindataError;
use crate::metrics::round_to;

/// Machine-readable error codes carried in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Arguments failed validation.
    InvalidInput,
    /// The ticker did not resolve to a visible company.
    TickerNotFound,
    /// A narrower lookup (report period, sector) found nothing.
    NotFound,
    /// The per-tool request budget is exhausted.
    RateLimitExceeded,
    /// No tool by that name.
    UnknownTool,
    /// The tool failed for reasons outside the caller's control.
    ExecutionError,
    /// The request body was not valid JSON.
    InvalidJson,
}

impl ErrorCode {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::TickerNotFound => "TICKER_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::UnknownTool => "UNKNOWN_TOOL",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::InvalidJson => "INVALID_JSON",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload of a failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub error_code: ErrorCode,
    pub message: String,
    pub hint: Option<String>,
}

/// Execution metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Wall-clock milliseconds, two decimals.
    pub execution_ms: f64,
    pub row_count: Option<usize>,
}

/// The envelope. `ok` is true iff `error` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool: String,
    pub ok: bool,
    pub data: Option<Value>,
    pub error: Option<ErrorDetail>,
    pub meta: Meta,
}

impl ToolResponse {
    /// Successful response.
    pub fn success(
        tool: impl Into<String>,
        data: Value,
        started: Instant,
        row_count: Option<usize>,
    ) -> Self {
        Self {
            tool: tool.into(),
            ok: true,
            data: Some(data),
            error: None,
            meta: Meta {
                execution_ms: elapsed_ms(started),
                row_count,
            },
        }
    }

    /// Failed response.
    pub fn failure(
        tool: impl Into<String>,
        error_code: ErrorCode,
        message: impl Into<String>,
        hint: Option<String>,
        started: Instant,
    ) -> Self {
        Self {
            tool: tool.into(),
            ok: false,
            data: None,
            error: Some(ErrorDetail {
                error_code,
                message: message.into(),
                hint,
            }),
            meta: Meta {
                execution_ms: elapsed_ms(started),
                row_count: None,
            },
        }
    }

    /// Failed response for a tool-facing error.
    ///
    /// Internal errors have no envelope code and are reported as
    /// `EXECUTION_ERROR`.
    pub fn from_error(tool: impl Into<String>, err: &FindataError, started: Instant) -> Self {
        let code = err.error_code().unwrap_or(ErrorCode::ExecutionError);
        Self::failure(tool, code, err.user_message(), err.hint(), started)
    }

    /// The error code, if the call failed.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.error_code)
    }

    /// Serialize to the JSON text carried by transports.
    pub fn to_json(&self) -> Result<String, FindataError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Milliseconds since `started`, rounded to two decimals.
pub fn elapsed_ms(started: Instant) -> f64 {
    round_to(started.elapsed().as_secs_f64() * 1000.0, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let resp = ToolResponse::success("t", json!({"x": 1}), Instant::now(), Some(1));
        let v: Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["tool"], "t");
        assert_eq!(v["ok"], true);
        assert_eq!(v["data"]["x"], 1);
        assert!(v["error"].is_null());
        assert_eq!(v["meta"]["row_count"], 1);
        assert!(v["meta"]["execution_ms"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn test_failure_shape() {
        let resp = ToolResponse::failure(
            "t",
            ErrorCode::InvalidInput,
            "bad",
            None,
            Instant::now(),
        );
        let v: Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["ok"], false);
        assert!(v["data"].is_null());
        assert_eq!(v["error"]["error_code"], "INVALID_INPUT");
        assert_eq!(v["error"]["message"], "bad");
        // hint is present and null
        assert!(v["error"].as_object().unwrap().contains_key("hint"));
        assert!(v["error"]["hint"].is_null());
        assert!(v["meta"]["row_count"].is_null());
    }

    #[test]
    fn test_from_error_maps_codes() {
        let started = Instant::now();
        let resp = ToolResponse::from_error("t", &FindataError::ticker_not_found("ZZZZ"), started);
        assert_eq!(resp.error_code(), Some(ErrorCode::TickerNotFound));
        assert!(resp.error.unwrap().hint.is_some());

        let resp = ToolResponse::from_error("t", &FindataError::storage("disk"), started);
        assert_eq!(resp.error_code(), Some(ErrorCode::ExecutionError));
    }

    #[test]
    fn test_error_code_wire_names() {
        for code in [
            ErrorCode::InvalidInput,
            ErrorCode::TickerNotFound,
            ErrorCode::NotFound,
            ErrorCode::RateLimitExceeded,
            ErrorCode::UnknownTool,
            ErrorCode::ExecutionError,
            ErrorCode::InvalidJson,
        ] {
            let wire = serde_json::to_value(code).unwrap();
            assert_eq!(wire, code.as_str());
        }
    }
}
