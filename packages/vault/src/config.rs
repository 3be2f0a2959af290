use common::config::StorageConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::{Result, VaultError};

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Default: 10.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconcileConfig {
    /// Records fetched per catalog batch. Default: 50.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

fn default_batch_size() -> u64 {
    50
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DedupeConfig {
    /// Maximum number of groups reported. Default: 200.
    #[serde(default = "default_group_limit")]
    pub group_limit: usize,
}

fn default_group_limit() -> usize {
    200
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            group_limit: default_group_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset. Default: "info".
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub dedupe: DedupeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("VAULT_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("database.max_connections", 10_i64)?
            .set_default("storage.local.root", "./storage/blobs")?
            .set_default("storage.remote.region", "us-east-1")?
            .set_default("reconcile.batch_size", 50_i64)?
            .set_default("dedupe.group_limit", 200_i64)?
            .set_default("log.level", "info")?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., VAULT__STORAGE__REMOTE__BUCKET)
            .add_source(Environment::with_prefix("VAULT").separator("__"))
            .build()?;

        Self::from_config(s)
    }

    /// Deserialize an already layered [`Config`] and check the invariants
    /// serde cannot express.
    pub fn from_config(s: Config) -> Result<Self> {
        let config: Self = s.try_deserialize()?;
        config
            .storage
            .remote
            .validate()
            .map_err(|e| VaultError::Config(ConfigError::Message(e)))?;
        Ok(config)
    }
}
