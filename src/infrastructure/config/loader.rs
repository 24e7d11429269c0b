use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{Config, StorageBackend};

/// Project-local configuration file, read from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "issue-tracker.yaml";

/// Prefix of environment variable overrides, `__` separates nested keys.
pub const ENV_PREFIX: &str = "ISSUE_TRACKER_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Server host cannot be empty")]
    EmptyHost,

    #[error("Invalid port: {0}. Must be between 1 and 65535")]
    InvalidPort(u16),

    #[error("Invalid request_timeout_secs: {0}. Must be at least 1")]
    InvalidRequestTimeout(u64),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. issue-tracker.yaml in the working directory (optional)
    /// 3. Environment variables (`ISSUE_TRACKER_*` prefix)
    /// 4. `PORT`, mapped to `server.port`
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(Path::new(DEFAULT_CONFIG_FILE))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration with `path` in place of the default config file.
    ///
    /// Environment overrides still apply. A missing file is an error here.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Self::figment(path)
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.server.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        if config.server.port == 0 {
            return Err(ConfigError::InvalidPort(config.server.port));
        }

        if config.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout(
                config.server.request_timeout_secs,
            ));
        }

        // The path is ignored by the memory backend.
        if config.storage.backend == StorageBackend::Sqlite && config.storage.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.storage.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.storage.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}
