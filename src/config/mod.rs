//! Configuration management
//!
//! Layered configuration loaded from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! Configuration can be overridden using environment variables with the
//! pattern `FLOWD__<section>__<key>`, e.g.
//! `FLOWD__SERVER__BIND_ADDR=0.0.0.0:9000` or `FLOWD__BACKEND__PREFIX=/flow`.
//!
//! By default the file is loaded from `config/flowd.toml`; override the
//! path with the `FLOWD_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{BackendConfig, Config, ExecutorConfig, ServerConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment) and
    /// validate it. The core is only ever constructed from a validated
    /// configuration.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, for tests.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
