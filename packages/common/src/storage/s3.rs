use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

use super::error::TierError;
use super::traits::{PutReceipt, Tier, UrlOptions};
use crate::config::RemoteTierConfig;

/// Remote durable tier backed by an S3-compatible bucket.
///
/// Objects are addressed by their opaque key, optionally below a prefix.
pub struct S3Tier {
    bucket: Box<Bucket>,
    prefix: Option<String>,
    url_expiry: Duration,
}

impl S3Tier {
    pub fn new(config: &RemoteTierConfig) -> Result<Self, TierError> {
        config.validate().map_err(TierError::Remote)?;

        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| TierError::Remote(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| TierError::Remote(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials).map_err(remote)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            prefix: config
                .prefix
                .as_deref()
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty()),
            url_expiry: Duration::from_secs(config.url_expiry_secs),
        })
    }

    /// Object path inside the bucket for `key`.
    pub fn object_path(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        }
    }
}

fn remote(err: S3Error) -> TierError {
    TierError::Remote(err.to_string())
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait]
impl Tier for S3Tier {
    fn label(&self) -> &'static str {
        "remote"
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<PutReceipt, TierError> {
        let path = self.object_path(key);
        let response = self
            .bucket
            .put_object_with_content_type(&path, &data, content_type)
            .await
            .map_err(remote)?;

        if !is_success(response.status_code()) {
            return Err(TierError::Remote(format!(
                "put {path} returned status {}",
                response.status_code()
            )));
        }

        Ok(PutReceipt {
            tier: self.label(),
            location: path,
            size: data.len() as u64,
        })
    }

    async fn get(&self, key: &str) -> Result<Bytes, TierError> {
        let path = self.object_path(key);
        let response = self.bucket.get_object(&path).await.map_err(remote)?;
        match response.status_code() {
            404 => Err(TierError::NotFound(key.to_string())),
            status if is_success(status) => Ok(response.bytes().clone()),
            status => Err(TierError::Remote(format!(
                "get {path} returned status {status}"
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, TierError> {
        let path = self.object_path(key);
        let response = self.bucket.delete_object(&path).await.map_err(remote)?;
        match response.status_code() {
            404 => Ok(false),
            status if is_success(status) => Ok(true),
            status => Err(TierError::Remote(format!(
                "delete {path} returned status {status}"
            ))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, TierError> {
        match self.size(key).await {
            Ok(_) => Ok(true),
            Err(TierError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn size(&self, key: &str) -> Result<u64, TierError> {
        let path = self.object_path(key);
        let (head, status) = self.bucket.head_object(&path).await.map_err(remote)?;
        match status {
            404 => Err(TierError::NotFound(key.to_string())),
            status if is_success(status) => Ok(head.content_length.unwrap_or(0).max(0) as u64),
            status => Err(TierError::Remote(format!(
                "head {path} returned status {status}"
            ))),
        }
    }

    async fn url(&self, key: &str, opts: &UrlOptions) -> Result<String, TierError> {
        let path = self.object_path(key);
        let mut queries = HashMap::new();
        queries.insert(
            "response-content-disposition".to_string(),
            opts.content_disposition(),
        );
        // Presigned URLs may live at most seven days.
        let expiry = opts
            .expires_in
            .unwrap_or(self.url_expiry)
            .as_secs()
            .clamp(1, 604_800) as u32;
        self.bucket
            .presign_get(&path, expiry, Some(queries))
            .await
            .map_err(remote)
    }
}
