//! # Key Management
//!
//! Ed25519 keypair types for Lumen identities.
//!
//! Every participant in a capsule exchange — the local assistant, every
//! registered mentor peer — is identified by an Ed25519 keypair. This module
//! handles creation, serialization, and basic key operations.
//!
//! ## Why Ed25519?
//!
//! - Deterministic signatures, so a weak RNG at signing time cannot leak
//!   the private key (the classic ECDSA failure mode).
//! - 32-byte keys and 64-byte signatures keep envelopes small.
//! - Fast verification — important when a sync session checks hundreds of
//!   capsule signatures in a burst.
//!
//! ## Key kinds
//!
//! Signing keys (this module) and key-agreement keys
//! ([`crate::crypto::agreement`]) are distinct Rust types. You cannot hand an
//! X25519 scalar to `sign()` or an Ed25519 key to `diffie_hellman()` — the
//! mistake fails to compile instead of failing in production. The only
//! runtime kind check left is PEM decoding, where the armor label and the
//! algorithm identifier inside the document are both validated.
//!
//! ## Security considerations
//!
//! - Private key material is zeroized on drop by the underlying
//!   `SigningKey`.
//! - Key generation pulls from `OsRng` only; there is no fallback entropy
//!   source to silently downgrade to.
//! - Key bytes are never logged, and no `Debug` impl in this file prints
//!   them.

use std::fmt;
use std::hash::{Hash, Hasher};

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use spki::{DecodePublicKey, EncodePublicKey};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::SIGNATURE_LENGTH;
use crate::crypto::codec::{self, CodecError};

/// Errors from key construction and serialization.
///
/// Deliberately coarse: error text that describes key material in detail
/// has a way of ending up in logs.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    /// Covers both "not PEM at all" and "PEM of the wrong algorithm" — the
    /// parser checks the algorithm identifier inside the document, so an
    /// X25519 key in Ed25519 clothing is rejected here too.
    #[error("malformed PEM: does not parse as an Ed25519 {expected} key")]
    BadPem { expected: &'static str },

    /// The armor label says the document is the other half of a keypair
    /// (e.g. a `PUBLIC KEY` block where a `PRIVATE KEY` was expected).
    #[error("wrong key kind: expected a {expected} PEM block")]
    WrongKind { expected: &'static str },

    #[error("PEM encoding failed")]
    PemEncodingFailed,
}

/// A Lumen identity keypair wrapping Ed25519 signing and verification keys.
///
/// This is the atomic unit of identity. Every sealed capsule, every peer
/// registration, every trust decision ultimately traces back to one of
/// these. The `SigningKey` inside never leaves this type except through
/// the explicitly named export methods below.
///
/// ## Serialization
///
/// `LumenKeypair` intentionally does NOT implement `Serialize`/`Deserialize`.
/// Serializing private keys should be a deliberate, conscious act, not
/// something that happens because someone shoved a keypair into a JSON
/// response. Use [`to_pkcs8_pem`](Self::to_pkcs8_pem) or
/// [`secret_key_bytes`](Self::secret_key_bytes) explicitly.
pub struct LumenKeypair {
    signing_key: SigningKey,
}

/// The public half of a Lumen identity, safe to share with the world.
///
/// This is what peers exchange so they can verify each other's capsule
/// signatures. Losing this is inconvenient but not catastrophic — it can be
/// re-derived from the signing key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LumenPublicKey {
    bytes: [u8; 32],
}

/// A detached Ed25519 signature over a message.
///
/// 64 bytes, deterministic for a given (key, message) pair.
///
/// Held as `Vec<u8>` so serde stays simple; a well-formed value is always
/// exactly 64 bytes. A `LumenSignature` of any other length simply fails
/// verification — no panics, just `false`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LumenSignature {
    bytes: Vec<u8>,
}

impl LumenKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    ///
    /// This is the preferred way to create a new identity. Entropy comes
    /// straight from the operating system; there is no userspace PRNG to
    /// seed or mis-seed.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Build a keypair deterministically from a 32-byte seed.
    ///
    /// **Warning**: the key is only as strong as the seed. Feed this from a
    /// CSPRNG or a KDF, nothing else.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Rebuild a keypair from its raw 32-byte secret.
    ///
    /// The public key is re-derived from the secret key — in Ed25519, the
    /// 32-byte secret key *is* the seed.
    pub fn from_bytes(secret_key_bytes: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self::from_seed(secret_key_bytes)
    }

    /// The public half of this identity.
    pub fn public_key(&self) -> LumenPublicKey {
        LumenPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Raw public key bytes. These 32 bytes are the shareable half — logs
    /// and wire messages may carry them freely.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a message and return a `LumenSignature`.
    ///
    /// Signing is deterministic per RFC 8032: one (key, message) pair, one
    /// signature, regardless of RNG state. A bad entropy source cannot leak
    /// the private key at signing time.
    pub fn sign(&self, message: &[u8]) -> LumenSignature {
        let sig = self.signing_key.sign(message);
        LumenSignature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// Verify a signature against this keypair's public key.
    ///
    /// Convenience method — equivalent to `self.public_key().verify()`.
    pub fn verify(&self, message: &[u8], signature: &LumenSignature) -> bool {
        self.public_key().verify(message, signature)
    }

    /// Export the raw 32-byte secret.
    ///
    /// **Treat the return value as radioactive.** Whoever holds these bytes
    /// *is* this identity. The method exists for the persistence path and
    /// for deliberate backup flows; nothing else should call it.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Export the private half as a PKCS#8 PEM document.
    ///
    /// The returned string is wrapped in [`Zeroizing`] so the armored secret
    /// is wiped from memory when the caller drops it. This is the format the
    /// identity file on disk uses.
    pub fn to_pkcs8_pem(&self) -> Result<Zeroizing<String>, KeyError> {
        self.signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|_| KeyError::PemEncodingFailed)
    }

    /// Parse a keypair from a PKCS#8 PEM document.
    ///
    /// Rejects a `PUBLIC KEY` block outright ([`KeyError::WrongKind`]) and
    /// anything that doesn't parse as an Ed25519 private key
    /// ([`KeyError::BadPem`]). The public half is re-derived from the parsed
    /// secret, so the two can never disagree.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, KeyError> {
        if pem.contains("BEGIN PUBLIC KEY") {
            return Err(KeyError::WrongKind {
                expected: "PRIVATE KEY",
            });
        }
        let signing_key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|_| KeyError::BadPem { expected: "private" })?;
        Ok(Self { signing_key })
    }

    /// Hex form of the public key for logs and display.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }
}

impl Clone for LumenKeypair {
    /// Cloning duplicates private key material. Legal, occasionally
    /// necessary, never free — every copy widens the surface that has to
    /// stay secret.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for LumenKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even
        // "partially." A partial leak is still a leak.
        write!(f, "LumenKeypair(pub={})", self.public_key().to_hex())
    }
}

impl PartialEq for LumenKeypair {
    /// Two keypairs are equal if their public keys match. Comparing secret
    /// material in a non-constant-time way is a bad habit, and for identity
    /// purposes the public key is what matters.
    fn eq(&self, other: &Self) -> bool {
        self.public_key_bytes() == other.public_key_bytes()
    }
}

impl Eq for LumenKeypair {}

// ---------------------------------------------------------------------------
// LumenPublicKey
// ---------------------------------------------------------------------------

impl LumenPublicKey {
    /// Create a `LumenPublicKey` from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Try to create a `LumenPublicKey` from a byte slice.
    ///
    /// Checks the length and that the bytes decode to an actual curve
    /// point — arbitrary 32-byte strings are not all valid keys, and the
    /// degenerate ones are exactly the ones an attacker would pick.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        if slice.len() != 32 {
            return Err(KeyError::InvalidPublicKey);
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);

        // Catches low-order points and other degenerate cases.
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;

        Ok(Self { bytes })
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Verify a signature against this public key.
    ///
    /// Returns `true` only on exact cryptographic validity. Any internal
    /// failure — bad point, wrong-length signature, engine error — is
    /// `false`. Verification never errs on the side of trust.
    pub fn verify(&self, message: &[u8], signature: &LumenSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig_bytes: [u8; SIGNATURE_LENGTH] = match signature.bytes.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => return false,
        };
        let dalek_sig = DalekSignature::from_bytes(&sig_bytes);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    /// The dalek `VerifyingKey` behind this wrapper.
    pub fn to_verifying_key(&self) -> Result<VerifyingKey, KeyError> {
        VerifyingKey::from_bytes(&self.bytes).map_err(|_| KeyError::InvalidPublicKey)
    }

    /// Export as an SPKI PEM document (`BEGIN PUBLIC KEY`).
    ///
    /// This is the wire and on-disk form of a public identity — what peers
    /// hand each other when registering, and what the public identity file
    /// contains.
    pub fn to_public_key_pem(&self) -> Result<String, KeyError> {
        let verifying_key = self.to_verifying_key()?;
        verifying_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|_| KeyError::PemEncodingFailed)
    }

    /// Parse a public key from an SPKI PEM document.
    ///
    /// Rejects a `PRIVATE KEY` block outright — accepting one here would
    /// mean a caller just pasted secret material where a public key goes,
    /// and the kindest thing to do is fail loudly.
    pub fn from_public_key_pem(pem: &str) -> Result<Self, KeyError> {
        if pem.contains("BEGIN PRIVATE KEY") || pem.contains("BEGIN ENCRYPTED PRIVATE KEY") {
            return Err(KeyError::WrongKind {
                expected: "PUBLIC KEY",
            });
        }
        let verifying_key = VerifyingKey::from_public_key_pem(pem)
            .map_err(|_| KeyError::BadPem { expected: "public" })?;
        Ok(Self {
            bytes: verifying_key.to_bytes(),
        })
    }

    /// Lowercase hex form, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse a public key from its hex form.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }
}

impl Hash for LumenPublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for LumenPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for LumenPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LumenPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// LumenSignature
// ---------------------------------------------------------------------------

impl LumenSignature {
    /// Create a signature from its raw 64-byte representation.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Returns the raw signature bytes (always 64 for valid signatures).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Base64 transport form — this is the `signature` field of a sealed
    /// capsule.
    pub fn to_b64(&self) -> String {
        codec::b64_encode(&self.bytes)
    }

    /// Parse a base64-encoded signature, rejecting anything that isn't
    /// exactly 64 decoded bytes.
    pub fn from_b64(s: &str) -> Result<Self, CodecError> {
        let bytes: [u8; SIGNATURE_LENGTH] = codec::b64_decode_exact(s)?;
        Ok(Self::from_bytes(bytes))
    }
}

impl fmt::Display for LumenSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_b64())
    }
}

impl fmt::Debug for LumenSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b64 = self.to_b64();
        if b64.len() > 16 {
            write!(f, "LumenSignature({}...)", &b64[..16])
        } else {
            write!(f, "LumenSignature({})", b64)
        }
    }
}
