//! Content digests for change detection.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of raw file bytes.
///
/// Computed over the bytes on disk, not the decoded text, so the digest is
/// stable regardless of which decoding path a file takes.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(content_digest(b"hello"), content_digest(b"hello"));
        assert_ne!(content_digest(b"hello"), content_digest(b"hello "));
    }

    #[test]
    fn digest_is_hex_sha256() {
        let d = content_digest(b"");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
