use std::path::PathBuf;

use xxhash_rust::xxh3::xxh3_64;

use super::error::TierError;

/// Fan-out digest of a local object name.
///
/// Only bounds directory size; it is not an identity or integrity check.
pub fn fanout_digest(name: &str) -> String {
    format!("{:016x}", xxh3_64(name.as_bytes()))
}

/// Relative path of a local object: `{h[0..2]}/{h[2..4]}/{name}`.
pub fn local_path_for(name: &str) -> PathBuf {
    let digest = fanout_digest(name);
    PathBuf::from(&digest[..2]).join(&digest[2..4]).join(name)
}

/// Reject names that would escape the shard directory.
pub fn validate_name(name: &str) -> Result<&str, TierError> {
    if name.is_empty() {
        return Err(TierError::InvalidKey("name cannot be empty".into()));
    }
    if name.contains('\0') {
        return Err(TierError::InvalidKey("name must not contain null bytes".into()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(TierError::InvalidKey(format!(
            "name must not contain path separators: {name}"
        )));
    }
    if name == "." || name == ".." || name.starts_with('.') {
        return Err(TierError::InvalidKey(format!(
            "name must not start with '.': {name}"
        )));
    }
    Ok(name)
}
