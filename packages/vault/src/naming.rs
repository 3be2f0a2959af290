//! Deterministic human-readable names for locally stored blobs.
//!
//! A descriptive name is `scope__name1__name2__key.ext`: the sanitized scope
//! label, the sorted and sanitized associated names, then the storage key.
//! The name only decides where the local tier keeps a file; the key remains
//! the addressing identity on both tiers.

use std::path::PathBuf;
use std::sync::Arc;

use common::storage::filesystem::FilesystemTier;
use serde::Serialize;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::catalog::BlobCatalog;
use crate::error::{Result, VaultError};
use crate::models::BlobObject;

pub const SEPARATOR: &str = "__";
pub const MAX_TOKEN_LEN: usize = 30;
/// Substituted when a token sanitizes to nothing.
pub const FALLBACK_TOKEN: &str = "unnamed";
pub const UNSCOPED_TOKEN: &str = "unscoped";
pub const UNTAGGED_TOKEN: &str = "untagged";

/// Reduce `input` to a lowercase `[a-z0-9_-]` token of at most
/// [`MAX_TOKEN_LEN`] characters.
pub fn sanitize(input: &str) -> String {
    let mut token = String::with_capacity(input.len());
    for c in input.nfd().filter(char::is_ascii) {
        let c = if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if c == '_' && token.ends_with('_') {
            continue;
        }
        token.push(c.to_ascii_lowercase());
    }

    let mut token = token.trim_matches('_').to_string();
    token.truncate(MAX_TOKEN_LEN);

    if token.is_empty() {
        FALLBACK_TOKEN.to_string()
    } else {
        token
    }
}

/// Build the descriptive name for a blob. Pure; the order of
/// `associated_names` does not matter.
pub fn generate(
    scope_name: &str,
    associated_names: &[String],
    key: &str,
    extension: Option<&str>,
) -> String {
    let scope = if scope_name.trim().is_empty() {
        UNSCOPED_TOKEN.to_string()
    } else {
        sanitize(scope_name)
    };

    let mut names: Vec<&str> = associated_names.iter().map(String::as_str).collect();
    names.sort_unstable();
    names.dedup();

    let mut parts = vec![scope];
    if names.is_empty() {
        parts.push(UNTAGGED_TOKEN.to_string());
    } else {
        parts.extend(names.into_iter().map(sanitize));
    }
    parts.push(key.to_string());

    let mut name = parts.join(SEPARATOR);
    if let Some(ext) = extension.filter(|e| !e.is_empty()) {
        name.push('.');
        name.push_str(ext);
    }
    name
}

/// File extension for a MIME content type, without the dot.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "" => None,
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/bmp" => Some("bmp"),
        "image/avif" => Some("avif"),
        "image/tiff" => Some("tiff"),
        other => mime_guess::get_mime_extensions_str(other).and_then(|exts| exts.first().copied()),
    }
}

/// Outcome of recomputing a blob's descriptive name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NameUpdate {
    /// The computed name matched the cached one.
    Unchanged { name: String },
    /// The local file was moved to the new name.
    Renamed { from: String, to: String },
    /// No local file existed; only the cached name changed.
    Recorded { name: String },
    /// The move failed; the new name is cached and the stale file remains.
    RenameFailed {
        from: String,
        to: String,
        error: String,
    },
}

pub struct NamingService {
    local: Arc<FilesystemTier>,
    catalog: Arc<dyn BlobCatalog>,
}

impl NamingService {
    pub fn new(local: Arc<FilesystemTier>, catalog: Arc<dyn BlobCatalog>) -> Self {
        Self { local, catalog }
    }

    pub fn generate(
        &self,
        scope_name: &str,
        associated_names: &[String],
        key: &str,
        extension: Option<&str>,
    ) -> String {
        generate(scope_name, associated_names, key, extension)
    }

    /// The name `blob` should currently be stored under.
    pub fn name_for(&self, blob: &BlobObject) -> String {
        generate(
            &blob.scope_name,
            &blob.associated_names,
            &blob.key,
            blob.extension(),
        )
    }

    /// Absolute local path for `name`.
    pub fn local_path_for(&self, name: &str) -> PathBuf {
        self.local.path_for_name(name)
    }

    /// Recompute the descriptive name of `blob`, persist the associated names
    /// and new cached name, then move its local file when the name changed.
    ///
    /// The record is written before the move: when the catalog rejects the
    /// update the file stays under the name the record still points to. A
    /// failed move is logged and reported in the outcome; only catalog
    /// failures are returned as errors.
    pub async fn update_name(&self, blob: &mut BlobObject) -> Result<NameUpdate> {
        let new_name = self.name_for(blob);
        let old_name = blob.local_name().to_string();
        let unchanged = blob.descriptive_name.as_deref() == Some(new_name.as_str());

        self.catalog
            .update_names(blob.id, &blob.associated_names, Some(&new_name))
            .await?;
        blob.descriptive_name = Some(new_name.clone());

        if unchanged {
            return Ok(NameUpdate::Unchanged { name: new_name });
        }

        let outcome = match self.local.rename(&old_name, &new_name).await {
            Ok(true) => NameUpdate::Renamed {
                from: old_name,
                to: new_name,
            },
            Ok(false) => {
                debug!(blob_id = %blob.id, name = %new_name, "No local file to rename");
                NameUpdate::Recorded { name: new_name }
            }
            Err(source) => {
                let err = VaultError::RenameFailure {
                    from: old_name.clone(),
                    to: new_name.clone(),
                    source,
                };
                warn!(blob_id = %blob.id, error = %err, "Local rename failed, keeping new name");
                NameUpdate::RenameFailed {
                    from: old_name,
                    to: new_name,
                    error: err.to_string(),
                }
            }
        };

        Ok(outcome)
    }
}
