use std::sync::Arc;

use common::storage::{Tier, TierError};
use futures::future::join_all;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::BlobCatalog;
use crate::error::Result;
use crate::models::{BlobObject, MigrationStats, TierStatus};
use crate::store::DualTierBlobStore;

pub const DEFAULT_BATCH_SIZE: u64 = 50;

/// Compares catalog records against what each tier actually holds.
///
/// Tiers are queried directly rather than through the dual store so a
/// fallback read can never mask a missing copy.
pub struct ReconciliationReporter {
    local: Arc<dyn Tier>,
    remote: Arc<dyn Tier>,
    catalog: Arc<dyn BlobCatalog>,
}

impl ReconciliationReporter {
    pub fn new(store: &DualTierBlobStore, catalog: Arc<dyn BlobCatalog>) -> Self {
        Self {
            local: store.local().clone(),
            remote: store.remote().clone(),
            catalog,
        }
    }

    /// Presence of `blob` in each tier. A copy whose size differs from the
    /// recorded size counts as absent.
    pub async fn status_of(&self, blob: &BlobObject) -> std::result::Result<TierStatus, TierError> {
        let (local, remote) = tokio::join!(
            holds(self.local.as_ref(), blob),
            holds(self.remote.as_ref(), blob),
        );
        Ok(TierStatus {
            present_locally: local?,
            present_remotely: remote?,
        })
    }

    /// Walk the whole catalog in `batch_size` batches and count tier presence.
    #[instrument(skip(self))]
    pub async fn scan(&self, batch_size: u64) -> Result<MigrationStats> {
        let mut stats = MigrationStats::default();
        self.walk(batch_size, |blob, status| match status {
            Ok(status) => stats.record(status),
            Err(e) => {
                warn!(blob_id = %blob.id, key = %blob.key, error = %e, "Status check failed");
                stats.record_error();
            }
        })
        .await?;
        stats.finish();

        info!(
            total = stats.total,
            both = stats.both,
            local = stats.local,
            cloud = stats.cloud,
            neither = stats.neither,
            errors = stats.error_count,
            progress = stats.migration_progress,
            "Reconciliation scan complete"
        );
        Ok(stats)
    }

    /// Every blob without a valid local copy. Blobs whose status could not
    /// be determined are logged and left out.
    #[instrument(skip(self))]
    pub async fn missing_objects(&self, batch_size: u64) -> Result<Vec<BlobObject>> {
        let mut missing = Vec::new();
        self.walk(batch_size, |blob, status| match status {
            Ok(status) if !status.present_locally => missing.push(blob),
            Ok(_) => {}
            Err(e) => {
                warn!(blob_id = %blob.id, key = %blob.key, error = %e, "Status check failed");
            }
        })
        .await?;
        Ok(missing)
    }

    async fn walk<F>(&self, batch_size: u64, mut visit: F) -> Result<()>
    where
        F: FnMut(BlobObject, std::result::Result<TierStatus, TierError>),
    {
        let batch_size = batch_size.max(1);
        let mut cursor: Option<Uuid> = None;

        loop {
            let batch = self.catalog.list_batch(cursor, batch_size).await?;
            let Some(last) = batch.last() else {
                break;
            };
            cursor = Some(last.id);
            let full = batch.len() as u64 == batch_size;

            let statuses = join_all(batch.iter().map(|blob| self.status_of(blob))).await;
            for (blob, status) in batch.into_iter().zip(statuses) {
                visit(blob, status);
            }

            if !full {
                break;
            }
        }
        Ok(())
    }
}

async fn holds(tier: &dyn Tier, blob: &BlobObject) -> std::result::Result<bool, TierError> {
    match tier.size(&blob.key).await {
        Ok(size) => Ok(size == blob.byte_size),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}
