use std::sync::Arc;

use bytes::Bytes;
use common::storage::filesystem::FilesystemTier;
use common::storage::{PutReceipt, Tier, UrlOptions};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, VaultError};

/// Descriptor of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    /// Tier the descriptor was taken from: local when it succeeded.
    pub tier: &'static str,
    pub location: String,
    pub size: u64,
    pub local_ok: bool,
    pub remote_ok: bool,
}

/// Blob store spanning a local and a remote tier.
///
/// Writes and deletes go to both tiers and succeed when either does; reads
/// prefer the local tier and fall back to the remote one.
#[derive(Clone)]
pub struct DualTierBlobStore {
    local: Arc<FilesystemTier>,
    remote: Arc<dyn Tier>,
}

impl DualTierBlobStore {
    pub fn new(local: Arc<FilesystemTier>, remote: Arc<dyn Tier>) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &Arc<FilesystemTier> {
        &self.local
    }

    pub fn remote(&self) -> &Arc<dyn Tier> {
        &self.remote
    }

    pub async fn upload(
        &self,
        key: &str,
        content: Bytes,
        content_type: &str,
    ) -> Result<WriteResult> {
        let (local, remote) = tokio::join!(
            self.local.put(key, content.clone(), content_type),
            self.remote.put(key, content, content_type),
        );

        let describe = |receipt: PutReceipt, local_ok: bool, remote_ok: bool| WriteResult {
            tier: receipt.tier,
            location: receipt.location,
            size: receipt.size,
            local_ok,
            remote_ok,
        };

        match (local, remote) {
            (Ok(receipt), Ok(_)) => Ok(describe(receipt, true, true)),
            (Ok(receipt), Err(e)) => {
                warn!(key, error = %e, "Remote write failed, object stored locally only");
                Ok(describe(receipt, true, false))
            }
            (Err(e), Ok(receipt)) => {
                warn!(key, error = %e, "Local write failed, object stored remotely only");
                Ok(describe(receipt, false, true))
            }
            (Err(local), Err(remote)) => Err(VaultError::StorageWriteFailure {
                key: key.to_string(),
                local,
                remote,
            }),
        }
    }

    pub async fn download(&self, key: &str) -> Result<Bytes> {
        let local = match self.local.get(key).await {
            Ok(content) => return Ok(content),
            Err(e) => e,
        };
        if local.is_not_found() {
            debug!(key, "Local miss, reading from remote");
        } else {
            warn!(key, error = %local, "Local read failed, falling back to remote");
        }

        self.remote
            .get(key)
            .await
            .map_err(|remote| VaultError::StorageReadFailure {
                key: key.to_string(),
                local,
                remote,
            })
    }

    /// Remove `key` from both tiers. Absence counts as success.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let (local, remote) = tokio::join!(self.local.delete(key), self.remote.delete(key));

        match (local, remote) {
            (Err(local), Err(remote)) => Err(VaultError::StorageDeleteFailure {
                key: key.to_string(),
                local,
                remote,
            }),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => {
                warn!(key, error = %e, "Delete failed on one tier");
                Ok(())
            }
            (Ok(_), Ok(_)) => Ok(()),
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        if present(self.local.as_ref(), key).await {
            return true;
        }
        present(self.remote.as_ref(), key).await
    }

    /// URL for `key`: the local one when the object is confirmed locally,
    /// otherwise the remote one.
    pub async fn url_for(&self, key: &str, opts: &UrlOptions) -> Result<String> {
        if present(self.local.as_ref(), key).await {
            return Ok(self.local.url(key, opts).await?);
        }
        Ok(self.remote.url(key, opts).await?)
    }
}

async fn present(tier: &dyn Tier, key: &str) -> bool {
    match tier.exists(key).await {
        Ok(found) => found,
        Err(e) => {
            warn!(tier = tier.label(), key, error = %e, "Existence check failed, treating as absent");
            false
        }
    }
}
