use std::sync::Arc;

use common::storage::Tier;
use common::storage::filesystem::FilesystemTier;
use common::storage::s3::S3Tier;

use crate::backfill::Backfill;
use crate::catalog::{BlobCatalog, CatalogNames, DbCatalog};
use crate::config::AppConfig;
use crate::database::init_db;
use crate::dedupe::DedupeDetector;
use crate::error::Result;
use crate::reconcile::ReconciliationReporter;
use crate::service::BlobService;
use crate::store::DualTierBlobStore;

/// Everything the storage layer needs, wired together.
#[derive(Clone)]
pub struct VaultState {
    pub catalog: Arc<dyn BlobCatalog>,
    pub store: DualTierBlobStore,
}

impl VaultState {
    /// Build the local tier over `catalog` so keys resolve to descriptive
    /// names, and pair it with `remote`.
    pub fn assemble(
        catalog: Arc<dyn BlobCatalog>,
        local: FilesystemTier,
        remote: Arc<dyn Tier>,
    ) -> Self {
        let local = local.with_name_lookup(Arc::new(CatalogNames(catalog.clone())));
        Self {
            store: DualTierBlobStore::new(Arc::new(local), remote),
            catalog,
        }
    }

    /// Connect the database and both tiers described by `config`.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let db = init_db(&config.database).await?;
        let catalog: Arc<dyn BlobCatalog> = Arc::new(DbCatalog::new(db));

        let mut local = FilesystemTier::new(config.storage.local.root.clone()).await?;
        if let Some(url) = &config.storage.local.public_url {
            local = local.with_public_url(url.clone());
        }
        let remote: Arc<dyn Tier> = Arc::new(S3Tier::new(&config.storage.remote)?);

        Ok(Self::assemble(catalog, local, remote))
    }

    pub fn service(&self) -> BlobService {
        BlobService::new(self.store.clone(), self.catalog.clone())
    }

    pub fn reporter(&self) -> ReconciliationReporter {
        ReconciliationReporter::new(&self.store, self.catalog.clone())
    }

    pub fn dedupe(&self) -> DedupeDetector {
        DedupeDetector::new(self.store.clone(), self.catalog.clone())
    }

    pub fn backfill(&self, batch_size: u64) -> Backfill {
        Backfill::new(&self.store, self.reporter(), batch_size)
    }
}
