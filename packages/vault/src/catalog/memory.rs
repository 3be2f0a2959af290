use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::BlobCatalog;
use crate::error::CatalogError;
use crate::models::{BlobObject, Fingerprint};

/// Process-local catalog keyed by blob id.
#[derive(Default)]
pub struct MemoryCatalog {
    records: RwLock<BTreeMap<Uuid, BlobObject>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl BlobCatalog for MemoryCatalog {
    async fn insert(&self, blob: &BlobObject) -> Result<(), CatalogError> {
        let mut records = self.records.write().await;
        if records.contains_key(&blob.id) {
            return Err(CatalogError::Conflict(format!("id {} already exists", blob.id)));
        }
        if records.values().any(|b| b.key == blob.key) {
            return Err(CatalogError::Conflict(format!(
                "key {} already exists",
                blob.key
            )));
        }
        records.insert(blob.id, blob.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<BlobObject>, CatalogError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<BlobObject>, CatalogError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|b| b.key == key)
            .cloned())
    }

    async fn list_batch(
        &self,
        after: Option<Uuid>,
        limit: u64,
    ) -> Result<Vec<BlobObject>, CatalogError> {
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        Ok(self
            .records
            .read()
            .await
            .range((lower, Bound::Unbounded))
            .take(limit as usize)
            .map(|(_, b)| b.clone())
            .collect())
    }

    async fn duplicate_fingerprints(
        &self,
        scope_id: Option<&str>,
        limit: u64,
    ) -> Result<Vec<(Fingerprint, u64)>, CatalogError> {
        let mut counts: BTreeMap<Fingerprint, u64> = BTreeMap::new();
        for blob in self.records.read().await.values() {
            if scope_id.is_none_or(|s| blob.scope_id == s) {
                *counts.entry(blob.fingerprint()).or_insert(0) += 1;
            }
        }

        let mut groups: Vec<_> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
        groups.sort_by(|(fa, na), (fb, nb)| nb.cmp(na).then_with(|| fa.cmp(fb)));
        groups.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(groups)
    }

    async fn members(&self, fingerprint: &Fingerprint) -> Result<Vec<BlobObject>, CatalogError> {
        let mut members: Vec<_> = self
            .records
            .read()
            .await
            .values()
            .filter(|b| &b.fingerprint() == fingerprint)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(members)
    }

    async fn update_names(
        &self,
        id: Uuid,
        associated_names: &[String],
        descriptive_name: Option<&str>,
    ) -> Result<(), CatalogError> {
        let mut records = self.records.write().await;
        let blob = records
            .get_mut(&id)
            .ok_or_else(|| CatalogError::Conflict(format!("blob {id} no longer exists")))?;
        blob.associated_names = associated_names.to_vec();
        blob.descriptive_name = descriptive_name.map(str::to_string);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, CatalogError> {
        Ok(self.records.write().await.remove(&id).is_some())
    }
}
