use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use super::error::TierError;
use super::layout::{local_path_for, validate_name};
use super::traits::{NameLookup, PutReceipt, Tier, UrlOptions, percent_encode};

/// Local-disk tier.
///
/// Objects are stored under their descriptive name (or their key when no
/// name has been assigned yet) in a two-level fan-out layout:
/// `{base_path}/{h[0..2]}/{h[2..4]}/{name}` where `h` is the xxh3 digest of
/// the name.
pub struct FilesystemTier {
    base_path: PathBuf,
    public_url: Option<String>,
    names: Option<Arc<dyn NameLookup>>,
}

impl FilesystemTier {
    /// Create a new filesystem tier rooted at `base_path`.
    pub async fn new(base_path: PathBuf) -> Result<Self, TierError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            public_url: None,
            names: None,
        })
    }

    /// Serve URLs below `public_url` instead of `file://` paths.
    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(public_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Resolve keys to descriptive names through `names`.
    pub fn with_name_lookup(mut self, names: Arc<dyn NameLookup>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Absolute path an object named `name` lives at.
    pub fn path_for_name(&self, name: &str) -> PathBuf {
        self.base_path.join(local_path_for(name))
    }

    /// Whether a file is currently stored under `name`.
    pub async fn contains_name(&self, name: &str) -> Result<bool, TierError> {
        let name = validate_name(name)?;
        Ok(fs::try_exists(self.path_for_name(name)).await?)
    }

    /// Move the file stored under `from` to `to` with a single rename.
    ///
    /// Returns `false` when nothing is stored under `from`.
    pub async fn rename(&self, from: &str, to: &str) -> Result<bool, TierError> {
        let from_path = self.path_for_name(validate_name(from)?);
        let to_path = self.path_for_name(validate_name(to)?);

        if !fs::try_exists(&from_path).await? {
            return Ok(false);
        }

        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        match fs::rename(&from_path, &to_path).await {
            Ok(()) => {
                debug!(from, to, "Renamed local object");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Map a key to the path of its current name.
    async fn object_path(&self, key: &str) -> Result<PathBuf, TierError> {
        let name = match &self.names {
            Some(names) => names.local_name(key).await?,
            None => None,
        };
        let name = name.as_deref().unwrap_or(key);
        Ok(self.path_for_name(validate_name(name)?))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    fn relative_url_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_path)
            .unwrap_or(path)
            .iter()
            .map(|p| p.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[async_trait]
impl Tier for FilesystemTier {
    fn label(&self) -> &'static str {
        "local"
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<PutReceipt, TierError> {
        let object_path = self.object_path(key).await?;

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(PutReceipt {
            tier: self.label(),
            location: object_path.to_string_lossy().into_owned(),
            size: data.len() as u64,
        })
    }

    async fn get(&self, key: &str) -> Result<Bytes, TierError> {
        let object_path = self.object_path(key).await?;
        match fs::read(&object_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TierError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, TierError> {
        let object_path = self.object_path(key).await?;
        match fs::remove_file(&object_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, TierError> {
        let object_path = self.object_path(key).await?;
        Ok(fs::try_exists(&object_path).await?)
    }

    async fn size(&self, key: &str) -> Result<u64, TierError> {
        let object_path = self.object_path(key).await?;
        match fs::metadata(&object_path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TierError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn url(&self, key: &str, opts: &UrlOptions) -> Result<String, TierError> {
        let object_path = self.object_path(key).await?;
        let Some(base) = &self.public_url else {
            return Ok(format!("file://{}", object_path.display()));
        };

        let mut url = format!("{base}/{}", self.relative_url_path(&object_path));
        url.push_str("?disposition=");
        url.push_str(opts.disposition.as_str());
        if let Some(filename) = &opts.filename {
            url.push_str("&filename=");
            url.push_str(&percent_encode(filename));
        }
        Ok(url)
    }
}
