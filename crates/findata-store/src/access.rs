//! Row visibility.
//!
//! Companies are either public (`user_id IS NULL`) or owned by one user. A
//! caller sees public companies, their own companies, and everything when
//! their role is admin. Financials, prices and ratings are reached only
//! through a visible company.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anonymous,
    User,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anonymous" | "anon" => Some(Self::Anonymous),
            "user" | "authenticated" => Some(Self::User),
            "admin" | "service_role" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Anonymous => "anonymous",
            Self::User => "user",
            Self::Admin => "admin",
        };
        f.write_str(s)
    }
}

/// Identity a query runs under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Option<String>,
    pub role: Role,
}

impl UserContext {
    /// Sees every row.
    pub fn admin() -> Self {
        Self {
            user_id: None,
            role: Role::Admin,
        }
    }

    /// Sees public rows only.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Anonymous,
        }
    }

    /// Sees public rows and rows owned by `user_id`.
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            role: Role::User,
        }
    }

    /// Context for a service with row-level security on or off.
    pub fn for_service(enable_rls: bool) -> Self {
        if enable_rls {
            Self::anonymous()
        } else {
            Self::admin()
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether a company owned by `owner` is visible.
    #[cfg(test)]
    fn can_see(&self, owner: Option<&str>) -> bool {
        match owner {
            None => true,
            Some(_) if self.is_admin() => true,
            Some(owner) => self.user_id.as_deref() == Some(owner),
        }
    }

    /// SQL predicate restricting `companies` rows, for a table aliased `alias`.
    ///
    /// The predicate binds one parameter: the caller's user id (or NULL).
    pub(crate) fn company_filter(&self, alias: &str) -> String {
        if self.is_admin() {
            "1 = 1".to_string()
        } else {
            format!("({alias}.user_id IS NULL OR {alias}.user_id = ?)")
        }
    }

    /// Parameters bound by [`Self::company_filter`].
    pub(crate) fn filter_params(&self) -> Vec<rusqlite::types::Value> {
        if self.is_admin() {
            Vec::new()
        } else {
            vec![match &self.user_id {
                Some(id) => rusqlite::types::Value::Text(id.clone()),
                None => rusqlite::types::Value::Null,
            }]
        }
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::anonymous()
    }
}
