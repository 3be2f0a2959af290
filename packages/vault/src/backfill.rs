use std::sync::Arc;

use common::storage::Tier;
use common::storage::filesystem::FilesystemTier;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::models::BlobObject;
use crate::reconcile::ReconciliationReporter;
use crate::store::DualTierBlobStore;

#[derive(Debug, Clone, Serialize)]
pub struct BackfillFailure {
    pub id: Uuid,
    pub key: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillReport {
    pub copied: usize,
    pub failed: usize,
    pub failures: Vec<BackfillFailure>,
}

/// Copies blobs that only the remote tier holds into the local tier.
pub struct Backfill {
    local: Arc<FilesystemTier>,
    remote: Arc<dyn Tier>,
    reporter: ReconciliationReporter,
    batch_size: u64,
}

impl Backfill {
    pub fn new(store: &DualTierBlobStore, reporter: ReconciliationReporter, batch_size: u64) -> Self {
        Self {
            local: store.local().clone(),
            remote: store.remote().clone(),
            reporter,
            batch_size,
        }
    }

    /// Copy up to `limit` missing blobs (all of them when `None`).
    #[instrument(skip(self))]
    pub async fn run(&self, limit: Option<usize>) -> Result<BackfillReport> {
        let missing = self.reporter.missing_objects(self.batch_size).await?;
        let mut report = BackfillReport::default();

        for blob in missing.into_iter().take(limit.unwrap_or(usize::MAX)) {
            match self.copy(&blob).await {
                Ok(()) => report.copied += 1,
                Err(error) => {
                    warn!(blob_id = %blob.id, key = %blob.key, %error, "Backfill failed");
                    report.failed += 1;
                    report.failures.push(BackfillFailure {
                        id: blob.id,
                        key: blob.key,
                        error,
                    });
                }
            }
        }

        info!(copied = report.copied, failed = report.failed, "Backfill complete");
        Ok(report)
    }

    async fn copy(&self, blob: &BlobObject) -> std::result::Result<(), String> {
        let content = self.remote.get(&blob.key).await.map_err(|e| e.to_string())?;
        if content.len() as u64 != blob.byte_size {
            return Err(format!(
                "remote copy is {} bytes, expected {}",
                content.len(),
                blob.byte_size
            ));
        }
        self.local
            .put(&blob.key, content, &blob.content_type)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}
