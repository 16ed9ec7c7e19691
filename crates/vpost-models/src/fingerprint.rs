//! Content fingerprinting for duplicate detection.
//!
//! A fingerprint is a SHA-256 hex digest over the exact input: the raw
//! bytes of an uploaded file, the URL string, or the inline text.
//! Byte-identical resubmissions always produce the same fingerprint;
//! any differing content never does.

use sha2::{Digest, Sha256};

/// Fingerprint raw bytes (uploaded files).
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Fingerprint a string (URLs, inline text).
pub fn fingerprint_str(s: &str) -> String {
    fingerprint_bytes(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(fingerprint_str("hello"), fingerprint_str("hello"));
        assert_eq!(fingerprint_bytes(b"hello"), fingerprint_str("hello"));
    }

    #[test]
    fn test_distinct_content_distinct_fingerprint() {
        assert_ne!(fingerprint_str("hello"), fingerprint_str("hello "));
        assert_ne!(fingerprint_str(""), fingerprint_str("\0"));
    }

    #[test]
    fn test_known_digest() {
        // sha256 of the empty input
        assert_eq!(
            fingerprint_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
