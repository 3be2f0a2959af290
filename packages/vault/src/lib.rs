pub mod backfill;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod database;
pub mod dedupe;
pub mod entity;
pub mod error;
pub mod integrity;
pub mod models;
pub mod naming;
pub mod reconcile;
pub mod service;
pub mod state;
pub mod store;

pub use error::{Result, VaultError};
pub use models::{BlobObject, DuplicateGroup, Fingerprint, MigrationStats, NewBlob};
pub use state::VaultState;
