//! Configuration for the db-csv MCP server

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DbConfig {
    /// Default database connection settings for `execute_query`
    #[serde(default)]
    pub database: DatabaseDefaults,
}

/// Process-wide default connection target.
///
/// Credentials are never stored here; the caller supplies them per call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseDefaults {
    /// Database URL, e.g. `sqlite:///var/data/app.db` or
    /// `postgres://db.internal:5432/analytics`
    pub url: Option<String>,

    /// Driver name (`sqlite` or `postgres`); derived from the URL scheme
    /// when omitted
    pub driver: Option<String>,
}

/// Source of the process-wide default connection target.
///
/// The executor takes this as an explicit dependency instead of reading
/// ambient state, so tests can substitute their own defaults.
pub trait ConnectionDefaults: Send + Sync {
    fn default_url(&self) -> Option<String>;
    fn default_driver(&self) -> Option<String>;
}

impl ConnectionDefaults for DbConfig {
    fn default_url(&self) -> Option<String> {
        self.database.url.clone()
    }

    fn default_driver(&self) -> Option<String> {
        self.database.driver.clone()
    }
}

impl DbConfig {
    /// Load configuration from file
    ///
    /// Looks for config in:
    /// 1. `DBCSV_CONFIG_PATH` environment variable
    /// 2. `~/.dbcsv/config.toml`
    pub fn load() -> Result<Self> {
        let config_path = if let Ok(path) = std::env::var("DBCSV_CONFIG_PATH") {
            PathBuf::from(path)
        } else {
            dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".dbcsv")
                .join("config.toml")
        };

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))
    }

    /// Create a config pointing at a specific default URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            database: DatabaseDefaults {
                url: Some(url.into()),
                driver: None,
            },
        }
    }
}
