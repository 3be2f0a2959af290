use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::catalog::BlobCatalog;
use crate::error::{Result, VaultError};
use crate::models::{DuplicateGroup, Fingerprint, MemberFailure, ResolutionResult};
use crate::store::DualTierBlobStore;

pub const DEFAULT_GROUP_LIMIT: usize = 200;

/// Finds blobs with identical content within a scope and collapses them.
pub struct DedupeDetector {
    store: DualTierBlobStore,
    catalog: Arc<dyn BlobCatalog>,
}

impl DedupeDetector {
    pub fn new(store: DualTierBlobStore, catalog: Arc<dyn BlobCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Groups of more than one blob sharing a fingerprint, largest first.
    ///
    /// `scope_id` restricts the search to one scope; `None` searches all
    /// scopes. At most `limit` groups are returned.
    #[instrument(skip(self))]
    pub async fn find_duplicate_groups(
        &self,
        scope_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DuplicateGroup>> {
        let candidates = self
            .catalog
            .duplicate_fingerprints(scope_id, limit as u64)
            .await?;

        let mut groups = Vec::with_capacity(candidates.len());
        for (fingerprint, _) in candidates {
            let members = self.catalog.members(&fingerprint).await?;
            // Members may have been removed since the counts were taken.
            if let Some(group) = DuplicateGroup::from_members(fingerprint, members) {
                groups.push(group);
            }
        }

        debug!(groups = groups.len(), "Duplicate groups found");
        Ok(groups)
    }

    /// Keep the oldest member of the group identified by `fingerprint` and
    /// delete every other member's bytes and record.
    ///
    /// Members are removed independently. When a member's bytes cannot be
    /// deleted its record is kept, so the group shows up again on the next
    /// search and the cleanup can be retried.
    #[instrument(skip(self, fingerprint), fields(fingerprint = %fingerprint))]
    pub async fn resolve(&self, fingerprint: &Fingerprint) -> Result<ResolutionResult> {
        let members = self.catalog.members(fingerprint).await?;
        let group = DuplicateGroup::from_members(fingerprint.clone(), members)
            .ok_or_else(|| VaultError::DuplicateGroupNotFound(fingerprint.clone()))?;

        let kept = group.canonical().id;
        let mut deleted = 0;
        let mut failures = Vec::new();

        for member in group.duplicates() {
            if let Err(e) = self.store.delete(&member.key).await {
                warn!(blob_id = %member.id, key = %member.key, error = %e, "Failed to delete duplicate bytes");
                failures.push(MemberFailure {
                    id: member.id,
                    error: e.to_string(),
                });
                continue;
            }

            match self.catalog.delete(member.id).await {
                Ok(true) => deleted += 1,
                Ok(false) => debug!(blob_id = %member.id, "Duplicate record already gone"),
                Err(e) => {
                    warn!(blob_id = %member.id, error = %e, "Failed to delete duplicate record");
                    failures.push(MemberFailure {
                        id: member.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        let result = ResolutionResult {
            kept,
            deleted,
            failures,
        };
        info!(%result, "Resolved duplicate group");
        Ok(result)
    }
}
