/// Library configuration
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file, read from the working directory when present
pub const CONFIG_FILE: &str = "cadence.toml";

/// Environment prefix (`CADENCE_DATABASE_URL`, `CADENCE_HISTORY_LIMIT`, ...)
pub const ENV_PREFIX: &str = "CADENCE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LibraryConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Listening history entries kept; 0 keeps everything
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// `tracing` filter directives; `RUST_LOG` wins when set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default = "default_quote_refresh_hours")]
    pub quote_refresh_hours: u64,
}

impl LibraryConfig {
    /// Load from `cadence.toml` (if it exists) and `CADENCE_*` variables
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from a specific file (skipped if missing), then the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = config::Config::builder();

        if path.exists() {
            settings = settings.add_source(config::File::from(PathBuf::from(path)));
        }

        // No nesting separator: field names contain underscores
        // (CADENCE_DATABASE_URL -> database_url)
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database URL is required (set CADENCE_DATABASE_URL)".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".to_string(),
            ));
        }

        self.quote_max_age()?;

        Ok(())
    }

    /// How long a cached daily quote stays fresh
    pub fn quote_max_age(&self) -> Result<Duration> {
        self.quote_refresh_hours
            .checked_mul(3600)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "quote_refresh_hours is too large: {}",
                    self.quote_refresh_hours
                ))
            })
    }
}

// Default values
fn default_database_url() -> String {
    "sqlite://cadence.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_history_limit() -> usize {
    50
}

fn default_log_filter() -> String {
    "info,cadence=debug".to_string()
}

fn default_quote_refresh_hours() -> u64 {
    24
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            history_limit: default_history_limit(),
            log_filter: default_log_filter(),
            quote_refresh_hours: default_quote_refresh_hours(),
        }
    }
}
