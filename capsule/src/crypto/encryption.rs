//! # AES-256-GCM Encryption
//!
//! Authenticated encryption for capsule content. Whatever a capsule carries —
//! study notes, worked examples, a peer's curated explanations — goes through
//! here before it touches the wire.
//!
//! AES-256-GCM carries the content because:
//!
//! - One primitive gives both secrecy and integrity, with the AAD hook the
//!   envelope format needs for its out-of-band context binding.
//! - AES-NI makes it effectively free on the desktops the assistant
//!   actually runs on.
//! - 256-bit keys leave margin to spare.
//!
//! ## Nonce management
//!
//! GCM fails catastrophically under nonce reuse: two messages sealed with
//! the same (key, nonce) pair let an attacker recover the XOR of the
//! plaintexts and forge tags for that key from then on.
//!
//! Our strategy: random 96-bit nonces from a CSPRNG, a fresh one for every
//! call. Random nonces stay collision-free to roughly 2^48 messages per
//! key, and session keys rotate (via the agreement module) long before
//! any key sees that much traffic.
//!
//! ## Wire format
//!
//! Unlike a packed `nonce || ciphertext` blob, the capsule envelope carries
//! ciphertext, tag, and nonce as three separate fields, each base64-encoded
//! independently. [`AeadCiphertext`] is that triple; the tag is split off the
//! ciphertext here so no other layer has to know GCM appends it.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use thiserror::Error;

use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH, AES_TAG_LENGTH};
use crate::crypto::codec::{self, CodecError};

/// Errors from sealing and opening.
///
/// We intentionally keep these vague. The difference between "wrong key",
/// "wrong associated data", and "corrupted ciphertext" is none of an
/// attacker's business — all three are [`AuthenticationFailed`].
///
/// [`AuthenticationFailed`]: EncryptionError::AuthenticationFailed
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("authentication failed: wrong key, wrong associated data, or tampered ciphertext")]
    AuthenticationFailed,

    #[error("invalid key length: expected {AES_KEY_LENGTH} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("malformed transport field")]
    Transport(#[from] CodecError),
}

/// The output of one authenticated encryption: ciphertext, tag, and nonce.
///
/// Ciphertext length always equals plaintext length — GCM is a stream mode,
/// there is no padding. The 16-byte tag authenticates ciphertext and
/// associated data together; the 12-byte nonce is fresh per call and never
/// secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeadCiphertext {
    pub ciphertext: Vec<u8>,
    pub tag: [u8; AES_TAG_LENGTH],
    pub nonce: [u8; AES_NONCE_LENGTH],
}

impl AeadCiphertext {
    /// Base64 transport form of the ciphertext (`encrypted_content` field).
    pub fn ciphertext_b64(&self) -> String {
        codec::b64_encode(&self.ciphertext)
    }

    /// Base64 transport form of the authentication tag (`gcm_tag` field).
    pub fn tag_b64(&self) -> String {
        codec::b64_encode(&self.tag)
    }

    /// Base64 transport form of the nonce (`encryption_iv` field).
    pub fn nonce_b64(&self) -> String {
        codec::b64_encode(&self.nonce)
    }

    /// Reassemble a triple from its base64 transport fields, rejecting
    /// malformed base64 and wrong-length tags/nonces before any
    /// cryptography runs.
    pub fn from_transport(
        ciphertext_b64: &str,
        nonce_b64: &str,
        tag_b64: &str,
    ) -> Result<Self, EncryptionError> {
        Ok(Self {
            ciphertext: codec::b64_decode(ciphertext_b64)?,
            tag: codec::b64_decode_exact(tag_b64)?,
            nonce: codec::b64_decode_exact(nonce_b64)?,
        })
    }

    /// Decrypt this triple. Convenience for [`open`].
    pub fn open(&self, key: &[u8], aad: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        open(key, &self.ciphertext, &self.tag, &self.nonce, aad)
    }
}

/// Encrypt plaintext with AES-256-GCM under a fresh random nonce.
///
/// The `aad` bytes are authenticated but NOT encrypted — use them for
/// metadata that needs integrity protection without secrecy. The same AAD
/// must be supplied at decryption time or authentication fails; AAD is never
/// transmitted, both sides agree on it out-of-band or derive it from other
/// envelope fields.
///
/// # Errors
///
/// [`EncryptionError::InvalidKeyLength`] unless the key is exactly 32 bytes.
/// Keys are never truncated or padded to fit.
pub fn seal(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<AeadCiphertext, EncryptionError> {
    let cipher = cipher_for(key)?;

    // Random 96-bit nonce. This is the standard nonce size for AES-GCM and
    // the only one you should use.
    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut sealed = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| EncryptionError::EncryptFailed)?;

    // aes-gcm appends the 16-byte tag to the ciphertext; split it back out
    // because the envelope carries the two as separate fields.
    let tag_vec = sealed.split_off(sealed.len() - AES_TAG_LENGTH);
    let mut tag = [0u8; AES_TAG_LENGTH];
    tag.copy_from_slice(&tag_vec);

    Ok(AeadCiphertext {
        ciphertext: sealed,
        tag,
        nonce: nonce_bytes,
    })
}

/// Decrypt a ciphertext/tag/nonce triple.
///
/// The tag is recomputed internally over ciphertext and AAD during the final
/// decryption step; any mismatch discards the entire decrypted buffer and
/// returns [`EncryptionError::AuthenticationFailed`]. Partial plaintext never
/// escapes, and "wrong AAD" is indistinguishable from "tampered ciphertext"
/// by design.
pub fn open(
    key: &[u8],
    ciphertext: &[u8],
    tag: &[u8; AES_TAG_LENGTH],
    nonce: &[u8; AES_NONCE_LENGTH],
    aad: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let cipher = cipher_for(key)?;

    let mut buf = Vec::with_capacity(ciphertext.len() + AES_TAG_LENGTH);
    buf.extend_from_slice(ciphertext);
    buf.extend_from_slice(tag);

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: buf.as_slice(),
                aad,
            },
        )
        .map_err(|_| EncryptionError::AuthenticationFailed)
}

/// Build the cipher, enforcing the exact-32-byte key contract first.
fn cipher_for(key: &[u8]) -> Result<Aes256Gcm, EncryptionError> {
    if key.len() != AES_KEY_LENGTH {
        return Err(EncryptionError::InvalidKeyLength(key.len()));
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::InvalidKeyLength(key.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        // A fixed key for testing. Never use a predictable key in
        // production. But you knew that. Right?
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn seal_open_roundtrip() {
        let key = test_key();
        let plaintext = b"the quick brown fox jumps over the lazy dog";

        let sealed = seal(&key, plaintext, b"").unwrap();
        let recovered = sealed.open(&key, b"").unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn ciphertext_length_equals_plaintext_length() {
        // Stream-cipher AEAD: no padding, the tag lives in its own field.
        let key = test_key();
        let plaintext = b"exactly 26 bytes of input!";
        let sealed = seal(&key, plaintext, b"").unwrap();
        assert_eq!(sealed.ciphertext.len(), plaintext.len());
        assert_eq!(sealed.tag.len(), AES_TAG_LENGTH);
        assert_eq!(sealed.nonce.len(), AES_NONCE_LENGTH);
    }

    #[test]
    fn seal_empty_plaintext() {
        // Encrypting nothing is valid — you get an empty ciphertext plus a
        // tag that still authenticates the (empty) content and the AAD.
        let key = test_key();
        let sealed = seal(&key, b"", b"context").unwrap();
        assert!(sealed.ciphertext.is_empty());
        let recovered = sealed.open(&key, b"context").unwrap();
        assert!(recovered.is_empty());
    }

    #[test]
    fn wrong_key_fails() {
        let key = test_key();
        let sealed = seal(&key, b"secret", b"").unwrap();

        let mut wrong_key = test_key();
        wrong_key[0] ^= 0xFF;

        match sealed.open(&wrong_key, b"") {
            Err(EncryptionError::AuthenticationFailed) => {}
            other => panic!("expected AuthenticationFailed, got {:?}", other),
        }
    }

    #[test]
    fn flipped_ciphertext_bit_fails() {
        let key = test_key();
        let mut sealed = seal(&key, b"integrity matters", b"").unwrap();
        sealed.ciphertext[0] ^= 0x01;

        match sealed.open(&key, b"") {
            Err(EncryptionError::AuthenticationFailed) => {}
            other => panic!("expected AuthenticationFailed, got {:?}", other),
        }
    }

    #[test]
    fn flipped_tag_bit_fails() {
        let key = test_key();
        let mut sealed = seal(&key, b"integrity matters", b"").unwrap();
        sealed.tag[15] ^= 0x80;
        assert!(matches!(
            sealed.open(&key, b""),
            Err(EncryptionError::AuthenticationFailed)
        ));
    }

    #[test]
    fn flipped_nonce_bit_fails() {
        let key = test_key();
        let mut sealed = seal(&key, b"integrity matters", b"").unwrap();
        sealed.nonce[0] ^= 0x01;
        assert!(matches!(
            sealed.open(&key, b""),
            Err(EncryptionError::AuthenticationFailed)
        ));
    }

    #[test]
    fn wrong_aad_fails() {
        // Changing the AAD causes authentication failure. This is the whole
        // point of "authenticated" in AEAD.
        let key = test_key();
        let sealed = seal(&key, b"secret", b"correct-aad").unwrap();
        assert!(matches!(
            sealed.open(&key, b"wrong-aad"),
            Err(EncryptionError::AuthenticationFailed)
        ));
    }

    #[test]
    fn aad_roundtrip() {
        let key = test_key();
        let sealed = seal(&key, b"private study notes", b"topic:biology").unwrap();
        let recovered = sealed.open(&key, b"topic:biology").unwrap();
        assert_eq!(recovered, b"private study notes");
    }

    #[test]
    fn short_key_rejected() {
        match seal(&[0u8; 16], b"test", b"") {
            Err(EncryptionError::InvalidKeyLength(16)) => {}
            other => panic!("expected InvalidKeyLength, got {:?}", other),
        }
    }

    #[test]
    fn long_key_rejected() {
        // 33 bytes is not "32 bytes plus a bonus" — it's an error.
        assert!(matches!(
            seal(&[0u8; 33], b"test", b""),
            Err(EncryptionError::InvalidKeyLength(33))
        ));
    }

    #[test]
    fn unique_nonces() {
        // Two encryptions with the same key must produce different nonces.
        // A collision here means the RNG is handing out repeats, and every
        // key it ever produced is suspect.
        let key = test_key();
        let a = seal(&key, b"message", b"").unwrap();
        let b = seal(&key, b"message", b"").unwrap();
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn transport_roundtrip() {
        let key = test_key();
        let sealed = seal(&key, b"over the wire and back", b"aad").unwrap();

        let rebuilt = AeadCiphertext::from_transport(
            &sealed.ciphertext_b64(),
            &sealed.nonce_b64(),
            &sealed.tag_b64(),
        )
        .unwrap();
        assert_eq!(rebuilt, sealed);
        assert_eq!(rebuilt.open(&key, b"aad").unwrap(), b"over the wire and back");
    }

    #[test]
    fn transport_rejects_wrong_length_nonce() {
        let key = test_key();
        let sealed = seal(&key, b"x", b"").unwrap();
        let bad_nonce = crate::crypto::codec::b64_encode(&[0u8; 16]);
        assert!(matches!(
            AeadCiphertext::from_transport(&sealed.ciphertext_b64(), &bad_nonce, &sealed.tag_b64()),
            Err(EncryptionError::Transport(_))
        ));
    }

    #[test]
    fn large_plaintext() {
        // AES-GCM handles messages up to 2^36 - 32 bytes per NIST SP
        // 800-38D. We won't test that limit, but 1MB should be fine.
        let key = test_key();
        let plaintext = vec![0xAB; 1_000_000];
        let sealed = seal(&key, &plaintext, b"").unwrap();
        assert_eq!(sealed.open(&key, b"").unwrap(), plaintext);
    }
}
