use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::error::TierError;

/// How a URL handed to a client should present the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    #[default]
    Inline,
    Attachment,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

/// Options for [`Tier::url`].
#[derive(Debug, Clone, Default)]
pub struct UrlOptions {
    /// Lifetime of signed URLs; the tier's configured lifetime when unset.
    /// Ignored by tiers that do not sign.
    pub expires_in: Option<Duration>,
    pub disposition: Disposition,
    /// Filename suggested to the client.
    pub filename: Option<String>,
}

impl UrlOptions {
    /// Render the `Content-Disposition` value these options ask for.
    ///
    /// The plain `filename` parameter keeps only header-safe ASCII; the full
    /// name travels RFC 5987-encoded in `filename*`.
    pub fn content_disposition(&self) -> String {
        let kind = self.disposition.as_str();
        let Some(name) = &self.filename else {
            return kind.to_string();
        };

        let ascii: String = name
            .chars()
            .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
            .collect();
        let ascii = if ascii.is_empty() {
            "download".to_string()
        } else {
            ascii
        };

        format!(
            "{kind}; filename=\"{ascii}\"; filename*=UTF-8''{}",
            percent_encode(name)
        )
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub(crate) fn percent_encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

/// Outcome of a successful write to one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutReceipt {
    /// Which tier accepted the write.
    pub tier: &'static str,
    /// Tier-specific location of the stored object (path or object key).
    pub location: String,
    pub size: u64,
}

/// One storage tier addressed by opaque object keys.
#[async_trait]
pub trait Tier: Send + Sync {
    /// Short label used in logs and receipts.
    fn label(&self) -> &'static str;

    /// Store `data` under `key`, replacing any existing object.
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<PutReceipt, TierError>;

    /// Retrieve all bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Bytes, TierError>;

    /// Delete the object under `key`.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, TierError>;

    /// Check whether an object exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, TierError>;

    /// Size in bytes of the stored object.
    async fn size(&self, key: &str) -> Result<u64, TierError>;

    /// A URL a client can use to fetch the object directly.
    async fn url(&self, key: &str, opts: &UrlOptions) -> Result<String, TierError>;
}

/// Resolves the human-readable name a local object is stored under.
///
/// Tiers that lay objects out by descriptive name use this to map an opaque
/// key to its current name. `None` means the object has no name yet and is
/// stored under its key.
#[async_trait]
pub trait NameLookup: Send + Sync {
    async fn local_name(&self, key: &str) -> Result<Option<String>, TierError>;
}
