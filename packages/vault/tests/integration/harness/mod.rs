use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use common::storage::filesystem::FilesystemTier;
use common::storage::{PutReceipt, Tier, TierError, UrlOptions, local_path_for};
use tempfile::TempDir;
use uuid::Uuid;
use vault::catalog::{BlobCatalog, DbCatalog, MemoryCatalog};
use vault::config::DatabaseConfig;
use vault::database::init_db;
use vault::error::CatalogError;
use vault::models::{BlobObject, Fingerprint};
use vault::naming;
use vault::VaultState;

/// Wraps a tier and fails selected operations on demand.
pub struct FlakyTier {
    inner: FilesystemTier,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub fail_probes: AtomicBool,
}

impl FlakyTier {
    pub fn new(inner: FilesystemTier) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            fail_probes: AtomicBool::new(false),
        }
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), TierError> {
        if flag.load(Ordering::SeqCst) {
            Err(TierError::Remote(format!("injected {op} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Tier for FlakyTier {
    fn label(&self) -> &'static str {
        "remote"
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<PutReceipt, TierError> {
        Self::check(&self.fail_writes, "write")?;
        let receipt = self.inner.put(key, data, content_type).await?;
        Ok(PutReceipt {
            tier: self.label(),
            ..receipt
        })
    }

    async fn get(&self, key: &str) -> Result<Bytes, TierError> {
        Self::check(&self.fail_reads, "read")?;
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, TierError> {
        Self::check(&self.fail_deletes, "delete")?;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, TierError> {
        Self::check(&self.fail_probes, "exists")?;
        self.inner.exists(key).await
    }

    async fn size(&self, key: &str) -> Result<u64, TierError> {
        Self::check(&self.fail_probes, "size")?;
        self.inner.size(key).await
    }

    async fn url(&self, key: &str, opts: &UrlOptions) -> Result<String, TierError> {
        self.inner.url(key, opts).await
    }
}

/// Wraps a catalog and rejects name updates on demand.
pub struct FlakyCatalog {
    inner: Arc<dyn BlobCatalog>,
    fail_name_updates: AtomicBool,
}

impl FlakyCatalog {
    pub fn new(inner: Arc<dyn BlobCatalog>) -> Self {
        Self {
            inner,
            fail_name_updates: AtomicBool::new(false),
        }
    }

    pub fn reject_name_updates(&self, reject: bool) {
        self.fail_name_updates.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobCatalog for FlakyCatalog {
    async fn insert(&self, blob: &BlobObject) -> Result<(), CatalogError> {
        self.inner.insert(blob).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<BlobObject>, CatalogError> {
        self.inner.get(id).await
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<BlobObject>, CatalogError> {
        self.inner.find_by_key(key).await
    }

    async fn list_batch(
        &self,
        after: Option<Uuid>,
        limit: u64,
    ) -> Result<Vec<BlobObject>, CatalogError> {
        self.inner.list_batch(after, limit).await
    }

    async fn duplicate_fingerprints(
        &self,
        scope_id: Option<&str>,
        limit: u64,
    ) -> Result<Vec<(Fingerprint, u64)>, CatalogError> {
        self.inner.duplicate_fingerprints(scope_id, limit).await
    }

    async fn members(&self, fingerprint: &Fingerprint) -> Result<Vec<BlobObject>, CatalogError> {
        self.inner.members(fingerprint).await
    }

    async fn update_names(
        &self,
        id: Uuid,
        associated_names: &[String],
        descriptive_name: Option<&str>,
    ) -> Result<(), CatalogError> {
        if self.fail_name_updates.load(Ordering::SeqCst) {
            return Err(CatalogError::Conflict("injected name update failure".into()));
        }
        self.inner
            .update_names(id, associated_names, descriptive_name)
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, CatalogError> {
        self.inner.delete(id).await
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub state: VaultState,
    pub catalog: Arc<dyn BlobCatalog>,
    pub remote: Arc<FlakyTier>,
}

impl Harness {
    pub async fn with_catalog(dir: TempDir, catalog: Arc<dyn BlobCatalog>) -> Self {
        let local = FilesystemTier::new(dir.path().join("local")).await.unwrap();
        let remote = Arc::new(FlakyTier::new(
            FilesystemTier::new(dir.path().join("remote")).await.unwrap(),
        ));
        let state = VaultState::assemble(catalog.clone(), local, remote.clone());
        Self {
            dir,
            state,
            catalog,
            remote,
        }
    }

    pub async fn memory() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self::with_catalog(dir, Arc::new(MemoryCatalog::new())).await
    }

    pub async fn sqlite() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let catalog = sqlite_catalog(&dir).await;
        Self::with_catalog(dir, Arc::new(catalog)).await
    }

    pub fn local_root(&self) -> PathBuf {
        self.dir.path().join("local")
    }

    /// Where the local tier keeps `blob`.
    pub fn local_file(&self, blob: &BlobObject) -> PathBuf {
        self.state.store.local().path_for_name(blob.local_name())
    }

    /// Where the remote tier keeps `blob`.
    pub fn remote_file(&self, blob: &BlobObject) -> PathBuf {
        self.dir
            .path()
            .join("remote")
            .join(local_path_for(&blob.key))
    }

    /// Record and upload a blob with a caller-chosen checksum, bypassing
    /// content verification.
    pub async fn seed(
        &self,
        scope_id: &str,
        checksum: &str,
        content: &[u8],
        created_at: DateTime<Utc>,
    ) -> BlobObject {
        let mut blob = BlobObject {
            id: Uuid::now_v7(),
            key: Uuid::new_v4().simple().to_string(),
            checksum: checksum.to_string(),
            byte_size: content.len() as u64,
            content_type: "image/png".to_string(),
            scope_id: scope_id.to_string(),
            scope_name: format!("Scope {scope_id}"),
            created_at,
            associated_names: vec![],
            descriptive_name: None,
        };
        blob.descriptive_name = Some(naming::generate(
            &blob.scope_name,
            &blob.associated_names,
            &blob.key,
            blob.extension(),
        ));

        self.catalog.insert(&blob).await.unwrap();
        self.state
            .store
            .upload(&blob.key, Bytes::copy_from_slice(content), &blob.content_type)
            .await
            .unwrap();
        blob
    }
}

pub async fn sqlite_catalog(dir: &TempDir) -> DbCatalog {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("catalog.db").display());
    let db = init_db(&DatabaseConfig {
        url,
        max_connections: 1,
    })
    .await
    .unwrap();
    DbCatalog::new(db)
}

/// A minimal PNG-signed payload of `len` bytes.
pub fn png(len: usize) -> Bytes {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.resize(len.max(8), 0);
    Bytes::from(data)
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}
