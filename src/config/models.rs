use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// HTTP control-plane configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Key-value backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Where the embedded backend keeps its data.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    /// Keyspace prefix namespacing all of this process's keys.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            prefix: default_prefix(),
        }
    }
}

/// Executor and dispatch tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutorConfig {
    /// How many runs may execute simultaneously per dispatcher.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Total attempts per activation before a run is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base of the exponential retry backoff, in seconds.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base_secs(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    ([0, 0, 0, 0], 6969).into()
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/flowd")
}

fn default_prefix() -> String {
    "/".to_string()
}

fn default_concurrency() -> usize {
    8
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_secs() -> u64 {
    1
}
