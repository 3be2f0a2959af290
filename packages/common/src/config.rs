use std::path::PathBuf;

use serde::Deserialize;

/// Local (fast) tier configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct LocalTierConfig {
    /// Root directory for locally stored blobs. Default: "./storage/blobs".
    #[serde(default = "default_local_root")]
    pub root: PathBuf,
    /// Base URL the root directory is served under. When unset, `file://`
    /// URLs are produced.
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_local_root() -> PathBuf {
    PathBuf::from("./storage/blobs")
}

impl Default for LocalTierConfig {
    fn default() -> Self {
        Self {
            root: default_local_root(),
            public_url: None,
        }
    }
}

/// Remote (durable) tier configuration for an S3-compatible bucket.
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteTierConfig {
    pub bucket: String,
    /// Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Key prefix inside the bucket.
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Use path-style addressing. Default: false.
    #[serde(default)]
    pub path_style: bool,
    /// Lifetime of presigned URLs in seconds. Default: 300.
    #[serde(default = "default_url_expiry_secs")]
    pub url_expiry_secs: u64,
}

fn default_region() -> String {
    "us-east-1".into()
}
fn default_url_expiry_secs() -> u64 {
    300
}

impl RemoteTierConfig {
    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.trim().is_empty() {
            return Err("remote bucket name cannot be empty".into());
        }
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err("access_key and secret_key must be set together".into());
        }
        if self.url_expiry_secs == 0 {
            return Err("url_expiry_secs must be positive".into());
        }
        Ok(())
    }
}

/// Both storage tiers.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub local: LocalTierConfig,
    pub remote: RemoteTierConfig,
}
