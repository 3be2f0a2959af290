use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use common::storage::UrlOptions;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::BlobCatalog;
use crate::error::{Result, VaultError};
use crate::integrity;
use crate::models::{BlobObject, NewBlob};
use crate::naming::{NameUpdate, NamingService};
use crate::store::DualTierBlobStore;

/// A naming pass result for one blob.
#[derive(Debug, Clone, Serialize)]
pub struct NameChange {
    pub id: Uuid,
    #[serde(flatten)]
    pub update: NameUpdate,
}

/// Blob lifecycle: create, retag, read and destroy.
pub struct BlobService {
    store: DualTierBlobStore,
    catalog: Arc<dyn BlobCatalog>,
    naming: NamingService,
}

impl BlobService {
    pub fn new(store: DualTierBlobStore, catalog: Arc<dyn BlobCatalog>) -> Self {
        let naming = NamingService::new(store.local().clone(), catalog.clone());
        Self {
            store,
            catalog,
            naming,
        }
    }

    pub fn naming(&self) -> &NamingService {
        &self.naming
    }

    pub fn store(&self) -> &DualTierBlobStore {
        &self.store
    }

    async fn load(&self, id: Uuid) -> Result<BlobObject> {
        self.catalog
            .get(id)
            .await?
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    /// Verify `content`, record it, and write it to both tiers.
    ///
    /// The record is inserted first so the local tier can resolve the
    /// descriptive name; it is removed again if neither tier took the bytes.
    #[instrument(skip(self, content), fields(scope_id = %new.scope_id, size = content.len()))]
    pub async fn attach(&self, new: NewBlob, content: Bytes) -> Result<BlobObject> {
        let hash = integrity::verify(
            &content,
            &new.content_type,
            new.declared_checksum.as_deref(),
        )?;

        let mut blob = BlobObject {
            id: Uuid::now_v7(),
            key: Uuid::new_v4().simple().to_string(),
            checksum: hash.to_hex(),
            byte_size: content.len() as u64,
            content_type: new.content_type,
            scope_id: new.scope_id,
            scope_name: new.scope_name,
            created_at: new.created_at.unwrap_or_else(Utc::now),
            associated_names: new.associated_names,
            descriptive_name: None,
        };
        blob.descriptive_name = Some(self.naming.name_for(&blob));

        self.catalog.insert(&blob).await?;

        if let Err(e) = self
            .store
            .upload(&blob.key, content, &blob.content_type)
            .await
        {
            if let Err(cleanup) = self.catalog.delete(blob.id).await {
                warn!(blob_id = %blob.id, error = %cleanup, "Failed to remove record of unstored blob");
            }
            return Err(e);
        }

        info!(blob_id = %blob.id, key = %blob.key, "Blob attached");
        Ok(blob)
    }

    /// Replace the associated names of a blob and rename its local file.
    #[instrument(skip(self))]
    pub async fn retag(&self, id: Uuid, names: Vec<String>) -> Result<(BlobObject, NameUpdate)> {
        let mut blob = self.load(id).await?;
        blob.associated_names = names;
        let update = self.naming.update_name(&mut blob).await?;
        Ok((blob, update))
    }

    /// Recompute the descriptive name of one blob without changing its names.
    pub async fn refresh_name(&self, id: Uuid) -> Result<NameChange> {
        let mut blob = self.load(id).await?;
        let update = self.naming.update_name(&mut blob).await?;
        Ok(NameChange { id, update })
    }

    /// Recompute every descriptive name in the catalog. Unchanged names are
    /// left out of the result.
    #[instrument(skip(self))]
    pub async fn refresh_all_names(&self, batch_size: u64) -> Result<Vec<NameChange>> {
        let batch_size = batch_size.max(1);
        let mut changes = Vec::new();
        let mut cursor = None;

        loop {
            let batch = self.catalog.list_batch(cursor, batch_size).await?;
            let Some(last) = batch.last() else {
                break;
            };
            cursor = Some(last.id);
            let full = batch.len() as u64 == batch_size;

            for mut blob in batch {
                let update = self.naming.update_name(&mut blob).await?;
                if !matches!(update, NameUpdate::Unchanged { .. }) {
                    changes.push(NameChange {
                        id: blob.id,
                        update,
                    });
                }
            }

            if !full {
                break;
            }
        }
        Ok(changes)
    }

    /// Destroy a blob's bytes on both tiers, then its record.
    #[instrument(skip(self))]
    pub async fn purge(&self, id: Uuid) -> Result<()> {
        let blob = self.load(id).await?;
        self.store.delete(&blob.key).await?;
        self.catalog.delete(id).await?;
        info!(blob_id = %id, "Blob purged");
        Ok(())
    }

    pub async fn fetch(&self, id: Uuid) -> Result<Bytes> {
        let blob = self.load(id).await?;
        self.store.download(&blob.key).await
    }

    pub async fn url(&self, id: Uuid, opts: &UrlOptions) -> Result<String> {
        let blob = self.load(id).await?;
        self.store.url_for(&blob.key, opts).await
    }
}
