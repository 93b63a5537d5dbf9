//! Content fingerprinting for change detection.
//!
//! Uses xxh3-128, a non-cryptographic hash, instead of the SHA-256 the
//! registry historically used: fingerprints only gate re-indexing decisions,
//! never anything security-sensitive, so the faster hash is a straight win.

use xxhash_rust::xxh3::xxh3_128;

/// Compute a hex-encoded 128-bit content fingerprint for `content`.
pub fn fingerprint(content: &[u8]) -> String {
    format!("{:032x}", xxh3_128(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_same_fingerprint() {
        let a = fingerprint(b"export class Foo {}");
        let b = fingerprint(b"export class Foo {}");
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_different_fingerprint() {
        let a = fingerprint(b"export class Foo {}");
        let b = fingerprint(b"export class Bar {}");
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_is_32_hex_chars() {
        let f = fingerprint(b"hello");
        assert_eq!(f.len(), 32);
        assert!(f.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
