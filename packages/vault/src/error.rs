use common::storage::TierError;
use sea_orm::DbErr;
use thiserror::Error;

use crate::models::Fingerprint;

/// Metadata store failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Error)]
pub enum VaultError {
    /// Both tiers rejected a write.
    #[error("Write of {key} failed on both tiers (local: {local}; remote: {remote})")]
    StorageWriteFailure {
        key: String,
        local: TierError,
        remote: TierError,
    },

    /// Neither tier could produce the object.
    #[error("Read of {key} failed on both tiers (local: {local}; remote: {remote})")]
    StorageReadFailure {
        key: String,
        local: TierError,
        remote: TierError,
    },

    /// Neither tier could confirm the object is gone.
    #[error("Delete of {key} failed on both tiers (local: {local}; remote: {remote})")]
    StorageDeleteFailure {
        key: String,
        local: TierError,
        remote: TierError,
    },

    /// Local rename during a naming update failed. Logged, never propagated
    /// out of the naming update.
    #[error("Rename of {from} to {to} failed: {source}")]
    RenameFailure {
        from: String,
        to: String,
        source: TierError,
    },

    #[error("No duplicate group for {0}")]
    DuplicateGroupNotFound(Fingerprint),

    #[error("Invalid content signature: {0}")]
    InvalidContentSignature(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Tier error: {0}")]
    Tier(#[from] TierError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl VaultError {
    /// True when every tier reported the object as absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::StorageReadFailure { local, remote, .. } => {
                local.is_not_found() && remote.is_not_found()
            }
            Self::NotFound(_) => true,
            _ => false,
        }
    }
}

impl From<DbErr> for VaultError {
    fn from(err: DbErr) -> Self {
        VaultError::Catalog(CatalogError::Db(err))
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
