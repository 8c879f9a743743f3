//! # Hashing Utilities
//!
//! SHA-256 digests for capsule content addressing and audit logging. The
//! rest of the Lumen toolchain (vector store, import/export, the peers we
//! exchange capsules with) speaks SHA-256, so that's what the envelope
//! format speaks too. One hash function, zero debates.

use sha2::{Digest, Sha256};

/// SHA-256 of `data`.
///
/// Returns a fixed 32-byte digest. This is the digest that identifies a
/// capsule's content in logs and in the knowledge store — it lets an
/// operator audit what was ingested without the logs ever containing the
/// plaintext itself.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// SHA-256 digest as a lowercase hex string. 64 characters for 32 bytes.
///
/// The logging/content-addressing form of [`sha256`]. Lowercase by contract:
/// digests are compared as strings downstream, and a mixed-case digest would
/// silently never match.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // The empty-input vector from FIPS 180-4.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_deterministic() {
        let a = sha256(b"lumen");
        let b = sha256(b"lumen");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn different_inputs_differ() {
        assert_ne!(sha256(b"lumen"), sha256(b"Lumen")); // case sensitive!
    }

    #[test]
    fn hex_form_is_lowercase() {
        let digest = sha256_hex(b"capsule content");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, digest.to_lowercase());
    }
}
