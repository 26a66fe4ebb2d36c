use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Application configuration
/// In debug builds: loads from .env file first if present
/// In release builds: environment variables only
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite database file path
    pub database_path: PathBuf,
    /// Secret used to derive catalog entity identifiers
    pub hash_secret: String,
    /// Base URL of the external compatibility lookup service
    pub compat_base_url: Option<String>,
}

impl Config {
    /// Load configuration based on build mode
    pub fn load() -> Result<Self, ConfigError> {
        #[cfg(debug_assertions)]
        if dotenvy::dotenv().is_ok() {
            tracing::debug!("Config: loaded .env file");
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError> {
        let database_path = std::env::var("CATALOG_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("catalog.db"));

        let hash_secret = std::env::var("CATALOG_HASH_SECRET")
            .map_err(|_| ConfigError::MissingVar("CATALOG_HASH_SECRET"))?;

        let compat_base_url = std::env::var("CATALOG_COMPAT_URL").ok();

        Ok(Self {
            database_path,
            hash_secret,
            compat_base_url,
        })
    }
}
