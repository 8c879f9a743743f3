//! # Protocol Configuration & Constants
//!
//! Every magic number in the capsule core lives here. A length or label
//! hardcoded anywhere else is a bug waiting for a reviewer to find it.
//!
//! These values define the capsule envelope format. Changing them after
//! capsules have been exchanged with peers breaks every previously sealed
//! envelope, so choose wisely.

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Ed25519 for identity signatures: deterministic, 128-bit security, and
/// the dalek implementation is constant-time where it matters.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Ed25519 secret key (seed) length in bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Public (verifying) key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. 64 bytes, no exceptions.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Key exchange & derivation
// ---------------------------------------------------------------------------

/// X25519 for Diffie-Hellman key exchange. Curve25519 again, just wearing
/// its Montgomery coordinates.
pub const KEY_EXCHANGE_ALGORITHM: &str = "X25519";

/// X25519 shared-secret length in bytes. Fixed by the curve.
pub const SHARED_SECRET_LENGTH: usize = 32;

/// HKDF-SHA256 can expand at most 255 hash blocks of output (RFC 5869).
/// Asking for more is a caller bug, not something to round down silently.
pub const HKDF_MAX_OUTPUT_LENGTH: usize = 255 * 32;

/// Domain-separation context for capsule session keys. Mixed into the HKDF
/// `info` parameter so a key derived for capsule transport can never collide
/// with a key derived for any other purpose.
pub const CAPSULE_KEY_CONTEXT: &[u8] = b"lumen-capsule v1 session key";

// ---------------------------------------------------------------------------
// Symmetric encryption
// ---------------------------------------------------------------------------

/// AES-256-GCM for capsule content: 256-bit keys, 96-bit nonces, 128-bit
/// authentication tags.
pub const SYMMETRIC_ALGORITHM: &str = "AES-256-GCM";

/// AES-256-GCM key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-GCM nonce length in bytes. GCM wants exactly 96 bits; any other
/// length gets hashed into a working nonce internally and is not worth the
/// interop trouble.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Content digests use SHA-256 — the rest of the Lumen toolchain (and most
/// of the world) speaks it, and capsule digests travel across that boundary.
pub const DIGEST_ALGORITHM: &str = "SHA-256";

/// Hash output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Identity persistence
// ---------------------------------------------------------------------------

/// Default file name for the persisted private identity key (PKCS#8 PEM).
pub const DEFAULT_PRIVATE_KEY_FILE: &str = "identity_private.pem";

/// Default file name for the persisted public identity key (SPKI PEM).
pub const DEFAULT_PUBLIC_KEY_FILE: &str = "identity_public.pem";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_parameter_sizes() {
        assert_eq!(SIGNING_KEY_LENGTH, 32);
        assert_eq!(VERIFYING_KEY_LENGTH, 32);
        assert_eq!(SIGNATURE_LENGTH, 64);
        assert_eq!(AES_KEY_LENGTH, 32);
        assert_eq!(AES_NONCE_LENGTH, 12);
        assert_eq!(AES_TAG_LENGTH, 16);
        assert_eq!(SHARED_SECRET_LENGTH, 32);
        assert_eq!(HASH_OUTPUT_LENGTH, 32);
    }

    #[test]
    fn hkdf_bound_matches_rfc_5869() {
        // 255 * HashLen for SHA-256.
        assert_eq!(HKDF_MAX_OUTPUT_LENGTH, 8160);
    }

    #[test]
    fn key_context_is_nonempty_and_versioned() {
        // The context string is part of the wire contract; it must carry a
        // version marker so a future v2 derivation can't collide with v1.
        assert!(!CAPSULE_KEY_CONTEXT.is_empty());
        assert!(std::str::from_utf8(CAPSULE_KEY_CONTEXT).unwrap().contains("v1"));
    }
}
