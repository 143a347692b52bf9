//! Service settings.
//!
//! Loaded from an optional TOML file, then overridden by `FINDATA_*`
//! environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FindataError, FindataResult};

/// Prefix of the environment variables that override file settings.
pub const ENV_PREFIX: &str = "FINDATA_";

/// Service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite database file, or `:memory:`
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Deployment environment name
    #[serde(default = "default_app_env")]
    pub app_env: String,

    /// Log level used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// MCP server name
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// MCP server version
    #[serde(default = "default_server_version")]
    pub server_version: String,

    /// Host to bind HTTP transports to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Restrict rows to the caller's visibility
    #[serde(default)]
    pub enable_rls: bool,

    /// Enforce per-tool request budgets
    #[serde(default = "default_true")]
    pub rate_limit_enabled: bool,

    /// Requests per window for ordinary tools
    #[serde(default = "default_rate_limit")]
    pub rate_limit_default: u32,

    /// Requests per window for heavy tools
    #[serde(default = "default_rate_limit_heavy")]
    pub rate_limit_heavy: u32,

    /// Rate-limit window in seconds
    #[serde(default = "default_window_seconds")]
    pub rate_limit_window_seconds: u64,

    /// Attach security headers to REST responses
    #[serde(default = "default_true")]
    pub enable_security_headers: bool,

    /// Comma-separated CORS origins, `*` for any
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

fn default_database_path() -> String {
    "./data/findata.db".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_server_name() -> String {
    "financial-data-mcp".to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_rate_limit() -> u32 {
    60
}

fn default_rate_limit_heavy() -> u32 {
    30
}

fn default_window_seconds() -> u64 {
    60
}

fn default_allowed_origins() -> String {
    "*".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            app_env: default_app_env(),
            log_level: default_log_level(),
            server_name: default_server_name(),
            server_version: default_server_version(),
            host: default_host(),
            port: default_port(),
            enable_rls: false,
            rate_limit_enabled: true,
            rate_limit_default: default_rate_limit(),
            rate_limit_heavy: default_rate_limit_heavy(),
            rate_limit_window_seconds: default_window_seconds(),
            enable_security_headers: true,
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> FindataResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FindataError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> FindataResult<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| FindataError::config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would disable or block every tool.
    pub fn validate(&self) -> FindataResult<()> {
        let budgets = [
            ("rate_limit_default", u64::from(self.rate_limit_default)),
            ("rate_limit_heavy", u64::from(self.rate_limit_heavy)),
            ("rate_limit_window_seconds", self.rate_limit_window_seconds),
        ];
        for (name, value) in budgets {
            if value == 0 {
                return Err(FindataError::config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    /// Load from an optional file, then apply the process environment.
    pub fn load(path: Option<&Path>) -> FindataResult<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env()?;
        Ok(settings)
    }

    /// Override fields from `FINDATA_*` environment variables.
    pub fn apply_env(&mut self) -> FindataResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Override fields from a variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> FindataResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = get("DATABASE_PATH") {
            self.database_path = v;
        }
        if let Some(v) = get("APP_ENV") {
            self.app_env = v;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = get("SERVER_NAME") {
            self.server_name = v;
        }
        if let Some(v) = get("SERVER_VERSION") {
            self.server_version = v;
        }
        if let Some(v) = get("HOST") {
            self.host = v;
        }
        if let Some(v) = get("PORT") {
            self.port = parse_var("PORT", &v)?;
        }
        if let Some(v) = get("ENABLE_RLS") {
            self.enable_rls = parse_bool("ENABLE_RLS", &v)?;
        }
        if let Some(v) = get("RATE_LIMIT_ENABLED") {
            self.rate_limit_enabled = parse_bool("RATE_LIMIT_ENABLED", &v)?;
        }
        if let Some(v) = get("RATE_LIMIT_DEFAULT") {
            self.rate_limit_default = parse_var("RATE_LIMIT_DEFAULT", &v)?;
        }
        if let Some(v) = get("RATE_LIMIT_HEAVY") {
            self.rate_limit_heavy = parse_var("RATE_LIMIT_HEAVY", &v)?;
        }
        if let Some(v) = get("RATE_LIMIT_WINDOW_SECONDS") {
            self.rate_limit_window_seconds = parse_var("RATE_LIMIT_WINDOW_SECONDS", &v)?;
        }
        if let Some(v) = get("ENABLE_SECURITY_HEADERS") {
            self.enable_security_headers = parse_bool("ENABLE_SECURITY_HEADERS", &v)?;
        }
        if let Some(v) = get("ALLOWED_ORIGINS") {
            self.allowed_origins = v;
        }
        self.validate()
    }

    /// Request budgets derived from these settings.
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            enabled: self.rate_limit_enabled,
            default: self.rate_limit_default,
            heavy: self.rate_limit_heavy,
            window_seconds: self.rate_limit_window_seconds,
        }
    }

    /// Parsed CORS origins. Empty means any origin.
    pub fn cors_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty() && *o != "*")
            .map(str::to_string)
            .collect()
    }
}

/// Per-tool request budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub default: u32,
    pub heavy: u32,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default: default_rate_limit(),
            heavy: default_rate_limit_heavy(),
            window_seconds: default_window_seconds(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> FindataResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| FindataError::config(format!("{ENV_PREFIX}{name}: invalid value '{value}'")))
}

fn parse_bool(name: &str, value: &str) -> FindataResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(FindataError::config(format!(
            "{ENV_PREFIX}{name}: invalid boolean '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.database_path, "./data/findata.db");
        assert_eq!(s.server_name, "financial-data-mcp");
        assert_eq!(s.port, 8000);
        assert!(!s.enable_rls);
        assert_eq!(s.rate_limit(), RateLimitConfig::default());
        assert!(s.cors_origins().is_empty());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let s = Settings::from_toml("port = 9000\nenable_rls = true\n").unwrap();
        assert_eq!(s.port, 9000);
        assert!(s.enable_rls);
        assert_eq!(s.host, "127.0.0.1");
        assert_eq!(s.rate_limit_heavy, 30);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_path = \":memory:\"").unwrap();
        writeln!(file, "rate_limit_default = 10").unwrap();

        let s = Settings::from_file(file.path()).unwrap();
        assert_eq!(s.database_path, ":memory:");
        assert_eq!(s.rate_limit().default, 10);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Settings::from_file("/nonexistent/findata.toml").unwrap_err();
        assert!(matches!(err, FindataError::Config { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FINDATA_PORT", "9100"),
            ("FINDATA_ENABLE_RLS", "true"),
            ("FINDATA_RATE_LIMIT_HEAVY", "5"),
            ("FINDATA_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
        ]
        .into_iter()
        .collect();

        let mut s = Settings::default();
        s.apply_env_from(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(s.port, 9100);
        assert!(s.enable_rls);
        assert_eq!(s.rate_limit().heavy, 5);
        assert_eq!(
            s.cors_origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_zero_rate_limits_rejected() {
        for toml in [
            "rate_limit_default = 0",
            "rate_limit_heavy = 0",
            "rate_limit_window_seconds = 0",
        ] {
            let err = Settings::from_toml(toml).unwrap_err();
            assert!(matches!(err, FindataError::Config { .. }), "{toml}");
        }

        let mut s = Settings::default();
        let err = s
            .apply_env_from(|key| (key == "FINDATA_RATE_LIMIT_DEFAULT").then(|| "0".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("rate_limit_default"));
    }

    #[test]
    fn test_env_bad_value() {
        let mut s = Settings::default();
        let err = s
            .apply_env_from(|k| (k == "FINDATA_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("FINDATA_PORT"));
    }
}
