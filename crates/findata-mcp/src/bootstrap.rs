//! Startup shared by the binaries: settings, store and dispatcher.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use findata_core::config::Settings;
use findata_store::{Database, SeedMode};

use crate::dispatch::ToolDispatcher;

const LOG_TARGETS: [&str; 4] = ["findata_core", "findata_store", "findata_mcp", "findata_server"];

/// Load settings from an optional TOML file and the environment, then apply
/// a database override.
pub fn load_settings(config: Option<&Path>, database: Option<&str>) -> anyhow::Result<Settings> {
    let mut settings = Settings::load(config).context("failed to load settings")?;
    if let Some(path) = database {
        settings.database_path = path.to_string();
    }
    Ok(settings)
}

/// `RUST_LOG` when set, otherwise the findata crates at the configured level.
pub fn env_filter(settings: &Settings, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let (level, deps) = if verbose {
            ("debug", "rmcp=debug,tower_http=debug")
        } else {
            (settings.log_level.as_str(), "rmcp=warn")
        };
        EnvFilter::new(
            LOG_TARGETS
                .iter()
                .map(|target| format!("{target}={level}"))
                .chain(std::iter::once(deps.to_string()))
                .collect::<Vec<_>>()
                .join(","),
        )
    })
}

/// Open and migrate the configured database, seeding it when asked.
pub fn open_database(settings: &Settings, seed: Option<SeedMode>) -> anyhow::Result<Database> {
    let db = Database::open(&settings.database_path)
        .with_context(|| format!("failed to open database {}", settings.database_path))?;
    let applied = db.migrate().context("failed to apply migrations")?;
    if applied > 0 {
        tracing::info!("Applied {} migration(s)", applied);
    }
    if let Some(mode) = seed {
        db.seed_if_empty(mode).context("failed to seed database")?;
    }
    Ok(db)
}

/// Settings, store and dispatcher in one step.
pub fn dispatcher(settings: &Settings, seed: Option<SeedMode>) -> anyhow::Result<Arc<ToolDispatcher>> {
    let db = open_database(settings, seed)?;
    Ok(Arc::new(ToolDispatcher::new(db, settings)))
}
