//! Opaque keyset-pagination cursors.
//!
//! A cursor names the last ordering key a caller has seen together with the
//! query it came from. It is not signed and carries no authority: a tampered
//! cursor can only move the resume point, and a cursor that fails to decode
//! (or belongs to another query) simply restarts from the beginning.
//!
//! Query services fetch `limit + 1` rows ordered by a unique key, strictly
//! after the decoded key, and hand them to [`paginate`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Scope of the company name search.
pub const SCOPE_COMPANIES: &str = "companies";

/// Scope of a stock price history.
pub const SCOPE_PRICES: &str = "prices";

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    s: String,
    k: String,
}

/// Encode a resume point.
pub fn encode(scope: &str, key: &str) -> String {
    let payload = CursorPayload {
        s: scope.to_string(),
        k: key.to_string(),
    };
    // Serializing two strings cannot fail.
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a cursor issued for `scope`.
///
/// Returns `None` for missing, malformed or foreign cursors.
pub fn decode(token: Option<&str>, scope: &str) -> Option<String> {
    let token = token?.trim();
    if token.is_empty() {
        return None;
    }

    let bytes = match URL_SAFE_NO_PAD.decode(token) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("Ignoring undecodable cursor: {}", e);
            return None;
        }
    };
    match serde_json::from_slice::<CursorPayload>(&bytes) {
        Ok(payload) if payload.s == scope => Some(payload.k),
        Ok(payload) => {
            tracing::debug!("Ignoring cursor for scope '{}' in '{}'", payload.s, scope);
            None
        }
        Err(e) => {
            tracing::debug!("Ignoring malformed cursor payload: {}", e);
            None
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Truncate an over-fetched result set to a page.
///
/// `rows` must hold at most `limit + 1` rows in ascending key order. When the
/// extra row is present it is dropped and the cursor points at the last
/// retained row.
pub fn paginate<T, F>(mut rows: Vec<T>, limit: usize, scope: &str, key_of: F) -> Page<T>
where
    F: Fn(&T) -> String,
{
    let has_more = rows.len() > limit;
    if has_more {
        rows.truncate(limit);
    }
    let next_cursor = if has_more {
        rows.last().map(|row| encode(scope, &key_of(row)))
    } else {
        None
    };
    Page {
        items: rows,
        has_more: next_cursor.is_some(),
        next_cursor,
    }
}
