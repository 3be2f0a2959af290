use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::naming::extension_for;

/// One stored binary payload plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobObject {
    pub id: Uuid,
    pub key: String,
    pub checksum: String,
    pub byte_size: u64,
    pub content_type: String,
    pub scope_id: String,
    pub scope_name: String,
    pub created_at: DateTime<Utc>,
    pub associated_names: Vec<String>,
    /// Cached result of the last naming pass.
    pub descriptive_name: Option<String>,
}

impl BlobObject {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            scope_id: self.scope_id.clone(),
            checksum: self.checksum.clone(),
            byte_size: self.byte_size,
            content_type: self.content_type.clone(),
        }
    }

    /// File extension implied by the content type, if any.
    pub fn extension(&self) -> Option<&'static str> {
        extension_for(&self.content_type)
    }

    /// Name the local tier currently stores this blob under.
    pub fn local_name(&self) -> &str {
        self.descriptive_name.as_deref().unwrap_or(&self.key)
    }
}

/// Content-equivalence class of a blob within its scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Fingerprint {
    pub scope_id: String,
    pub checksum: String,
    pub byte_size: u64,
    pub content_type: String,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scope={} checksum={} size={} type={}",
            self.scope_id, self.checksum, self.byte_size, self.content_type
        )
    }
}

/// Blobs sharing a fingerprint, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub fingerprint: Fingerprint,
    pub members: Vec<BlobObject>,
}

impl DuplicateGroup {
    /// Build a group from its members. Returns `None` unless there is more
    /// than one member.
    pub fn from_members(fingerprint: Fingerprint, mut members: Vec<BlobObject>) -> Option<Self> {
        if members.len() < 2 {
            return None;
        }
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Some(Self {
            fingerprint,
            members,
        })
    }

    /// The earliest-created member, kept on resolution.
    pub fn canonical(&self) -> &BlobObject {
        &self.members[0]
    }

    /// Every member except the canonical one.
    pub fn duplicates(&self) -> &[BlobObject] {
        &self.members[1..]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Presence of one blob in each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierStatus {
    pub present_locally: bool,
    pub present_remotely: bool,
}

/// Aggregate reconciliation counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationStats {
    /// Objects successfully checked; errored objects are not included.
    pub total: u64,
    /// Present only in the local tier.
    pub local: u64,
    /// Present only in the remote tier.
    pub cloud: u64,
    pub both: u64,
    pub neither: u64,
    pub error_count: u64,
    /// Percentage of checked objects present locally, one decimal.
    pub migration_progress: f64,
}

impl MigrationStats {
    pub fn record(&mut self, status: TierStatus) {
        self.total += 1;
        match (status.present_locally, status.present_remotely) {
            (true, true) => self.both += 1,
            (true, false) => self.local += 1,
            (false, true) => self.cloud += 1,
            (false, false) => self.neither += 1,
        }
    }

    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    /// Recompute `migration_progress` from the counts.
    pub fn finish(&mut self) {
        self.migration_progress = if self.total == 0 {
            0.0
        } else {
            let pct = (self.local + self.both) as f64 / self.total as f64 * 100.0;
            (pct * 10.0).round() / 10.0
        };
    }
}

/// A member that could not be removed while resolving a group.
#[derive(Debug, Clone, Serialize)]
pub struct MemberFailure {
    pub id: Uuid,
    pub error: String,
}

/// Outcome of resolving one duplicate group.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionResult {
    pub kept: Uuid,
    pub deleted: usize,
    pub failures: Vec<MemberFailure>,
}

impl fmt::Display for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.deleted == 1 {
            "duplicate"
        } else {
            "duplicates"
        };
        write!(f, "kept {}, deleted {} {noun}", self.kept, self.deleted)?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        Ok(())
    }
}

/// Input for creating a blob.
#[derive(Debug, Clone)]
pub struct NewBlob {
    pub scope_id: String,
    pub scope_name: String,
    pub content_type: String,
    pub associated_names: Vec<String>,
    /// Checksum the uploader claims for the content, verified on attach.
    pub declared_checksum: Option<String>,
    /// Creation time to record, for imports. Defaults to now.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewBlob {
    pub fn new(
        scope_id: impl Into<String>,
        scope_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            scope_id: scope_id.into(),
            scope_name: scope_name.into(),
            content_type: content_type.into(),
            associated_names: Vec::new(),
            declared_checksum: None,
            created_at: None,
        }
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.associated_names = names.into_iter().map(Into::into).collect();
        self
    }
}
