//! Configuration management for the Restaurant Back Office
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with RBO_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Object storage for product media
    pub storage: StorageConfig,

    /// Sales behaviour
    pub sales: SalesConfig,

    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// AWS Region
    pub region: String,

    /// S3 bucket for product images and videos
    pub bucket: String,

    /// Base URL objects are served from, without trailing slash
    pub public_base_url: String,

    /// Upload size limit in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SalesConfig {
    /// Reject sales that exceed stock unless the request says otherwise
    pub enforce_stock_by_default: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RBO_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("storage.region", "eu-west-1")?
            .set_default("storage.bucket", "restaurant-media")?
            .set_default("storage.public_base_url", "https://restaurant-media.s3.amazonaws.com")?
            .set_default("storage.max_upload_bytes", 50 * 1024 * 1024)?
            .set_default("sales.enforce_stock_by_default", false)?
            .set_default("logging.json", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (RBO_ prefix)
            .add_source(
                Environment::with_prefix("RBO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl StorageConfig {
    /// Public URL for an object key
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }

    /// Recover the object key from a URL produced by `public_url`
    pub fn key_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base_url.trim_end_matches('/'))
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> StorageConfig {
        StorageConfig {
            region: "eu-west-1".to_string(),
            bucket: "media".to_string(),
            public_base_url: "https://cdn.example.com/".to_string(),
            max_upload_bytes: 1024,
        }
    }

    #[test]
    fn test_public_url_round_trips_key() {
        let storage = storage();
        let url = storage.public_url("products/abc/def.jpg");
        assert_eq!(url, "https://cdn.example.com/products/abc/def.jpg");
        assert_eq!(storage.key_from_url(&url), Some("products/abc/def.jpg"));
    }

    #[test]
    fn test_key_from_foreign_url() {
        assert_eq!(storage().key_from_url("https://elsewhere.com/a.jpg"), None);
        assert_eq!(storage().key_from_url("https://cdn.example.com/"), None);
    }
}
