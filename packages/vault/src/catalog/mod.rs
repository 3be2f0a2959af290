//! Blob metadata store.
//!
//! The catalog is the record store behind every blob: it supplies
//! [`BlobObject`] records in id order for batched scans, answers fingerprint
//! queries for duplicate detection, and persists the cached descriptive name.

mod db;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use common::storage::{NameLookup, TierError};
use uuid::Uuid;

pub use db::DbCatalog;
pub use memory::MemoryCatalog;

use crate::error::CatalogError;
use crate::models::{BlobObject, Fingerprint};

#[async_trait]
pub trait BlobCatalog: Send + Sync {
    async fn insert(&self, blob: &BlobObject) -> Result<(), CatalogError>;

    async fn get(&self, id: Uuid) -> Result<Option<BlobObject>, CatalogError>;

    async fn find_by_key(&self, key: &str) -> Result<Option<BlobObject>, CatalogError>;

    /// Up to `limit` records with an id greater than `after`, ordered by id.
    async fn list_batch(
        &self,
        after: Option<Uuid>,
        limit: u64,
    ) -> Result<Vec<BlobObject>, CatalogError>;

    /// Fingerprints shared by more than one record, with their member
    /// counts, optionally restricted to one scope.
    ///
    /// Ordered by count descending, then by fingerprint. At most `limit`
    /// entries are returned.
    async fn duplicate_fingerprints(
        &self,
        scope_id: Option<&str>,
        limit: u64,
    ) -> Result<Vec<(Fingerprint, u64)>, CatalogError>;

    /// All records sharing `fingerprint`, oldest first.
    async fn members(&self, fingerprint: &Fingerprint) -> Result<Vec<BlobObject>, CatalogError>;

    /// Persist new associated names and the cached descriptive name.
    async fn update_names(
        &self,
        id: Uuid,
        associated_names: &[String],
        descriptive_name: Option<&str>,
    ) -> Result<(), CatalogError>;

    /// Returns `true` if a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, CatalogError>;
}

/// Resolves local-tier names from catalog records.
pub struct CatalogNames(pub Arc<dyn BlobCatalog>);

#[async_trait]
impl NameLookup for CatalogNames {
    async fn local_name(&self, key: &str) -> Result<Option<String>, TierError> {
        self.0
            .find_by_key(key)
            .await
            .map(|blob| blob.and_then(|b| b.descriptive_name))
            .map_err(|e| TierError::Lookup(e.to_string()))
    }
}
