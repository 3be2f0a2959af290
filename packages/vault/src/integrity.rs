use common::storage::ContentHash;

use crate::error::{Result, VaultError};

/// Magic-number prefixes of the image types the vault accepts.
const SIGNATURES: &[(&str, &[&[u8]])] = &[
    ("image/png", &[b"\x89PNG\r\n\x1a\n"]),
    ("image/jpeg", &[b"\xff\xd8\xff"]),
    ("image/jpg", &[b"\xff\xd8\xff"]),
    ("image/gif", &[b"GIF87a", b"GIF89a"]),
    ("image/bmp", &[b"BM"]),
];

/// Check `content` against its declared type and checksum.
///
/// Returns the computed hash on success. Types without a known signature
/// are accepted as-is.
pub fn verify(
    content: &[u8],
    content_type: &str,
    declared_checksum: Option<&str>,
) -> Result<ContentHash> {
    let hash = ContentHash::compute(content);

    if let Some(declared) = declared_checksum
        && !hash.matches(declared)
    {
        return Err(VaultError::InvalidContentSignature(format!(
            "checksum mismatch: declared {}, computed {hash}",
            declared.trim()
        )));
    }

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "image/webp" {
        let ok = content.len() >= 12 && &content[..4] == b"RIFF" && &content[8..12] == b"WEBP";
        return if ok {
            Ok(hash)
        } else {
            Err(mismatch(&essence))
        };
    }

    match SIGNATURES.iter().find(|(ty, _)| *ty == essence) {
        Some((_, magics)) if !magics.iter().any(|m| content.starts_with(m)) => {
            Err(mismatch(&essence))
        }
        _ => Ok(hash),
    }
}

fn mismatch(content_type: &str) -> VaultError {
    VaultError::InvalidContentSignature(format!(
        "content does not start with a {content_type} signature"
    ))
}
