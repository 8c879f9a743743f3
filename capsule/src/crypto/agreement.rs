//! # Ephemeral Key Agreement & Derivation
//!
//! X25519 key exchange plus HKDF-SHA256 for turning shared secrets into
//! capsule session keys.
//!
//! Forward secrecy is the point: capsules exchanged in a past session must
//! stay confidential even if a long-term identity key leaks later. We get
//! that by generating a fresh X25519 keypair per agreement, deriving the
//! session key, and throwing the ephemeral secret away. It is never
//! persisted, never reused, and Rust's type system enforces the "never
//! reused" part — the secret is consumed on derivation.
//!
//! ## Key derivation
//!
//! A raw Diffie-Hellman output never touches the AEAD directly. DH outputs
//! are curve points with algebraic structure, not uniformly random bytes. Every shared
//! secret goes through HKDF-SHA256 (extract-then-expand, RFC 5869) with a
//! domain-separation context before it is allowed anywhere near AES-GCM.

use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use thiserror::Error;
use x25519_dalek::{EphemeralSecret, PublicKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::{AES_KEY_LENGTH, CAPSULE_KEY_CONTEXT, HKDF_MAX_OUTPUT_LENGTH};

/// Errors in the key agreement and derivation protocol.
#[derive(Debug, Error)]
pub enum AgreementError {
    #[error("agreement already completed: ephemeral secret consumed")]
    SecretConsumed,

    #[error("HKDF output too long: requested {requested} bytes, max {HKDF_MAX_OUTPUT_LENGTH}")]
    OutputTooLong { requested: usize },
}

/// A raw X25519 shared secret, wiped from memory on drop.
///
/// This is keying *material*, not a key. It exists only to be fed into
/// [`session_key`] or [`hkdf_sha256`]; the AEAD engine will happily accept
/// its 32 bytes, which is exactly why it doesn't expose them as an array you
/// can casually copy around.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecretBytes([u8; 32]);

impl SharedSecretBytes {
    /// Borrow the raw secret for key derivation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// One side of an ephemeral Diffie-Hellman key agreement.
///
/// Generates a fresh X25519 keypair on creation. The public key goes to the
/// peer; [`diffie_hellman`](Self::diffie_hellman) consumes the secret when
/// the peer's public key arrives. After that the ephemeral key material is
/// gone — `x25519_dalek::EphemeralSecret` enforces single use at the type
/// level, so reusing an ephemeral key is not a bug you can write.
pub struct AgreementSession {
    /// `Option` because the secret is consumed on completion. Once it's
    /// `None`, the exchange is done and the key material no longer exists.
    secret: Option<EphemeralSecret>,
    public_key: PublicKey,
}

impl AgreementSession {
    /// Create a session with a fresh ephemeral X25519 keypair from `OsRng`.
    ///
    /// Don't sit on it — the sooner the public keys are exchanged and the
    /// session key derived, the sooner the ephemeral secret can be dropped.
    pub fn new() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public_key = PublicKey::from(&secret);
        Self {
            secret: Some(secret),
            public_key,
        }
    }

    /// The ephemeral public key to send to the peer.
    ///
    /// These 32 bytes are public by construction; they travel in the clear.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public_key.to_bytes()
    }

    /// Compute the raw shared secret from the peer's public key.
    ///
    /// Consumes the ephemeral secret — calling this twice returns
    /// [`AgreementError::SecretConsumed`]. The result is keying material
    /// only; run it through [`session_key`] before using it for encryption.
    pub fn diffie_hellman(
        &mut self,
        peer_public: &[u8; 32],
    ) -> Result<SharedSecretBytes, AgreementError> {
        let secret = self.secret.take().ok_or(AgreementError::SecretConsumed)?;
        let peer_pk = PublicKey::from(*peer_public);
        let raw = secret.diffie_hellman(&peer_pk);
        Ok(SharedSecretBytes(*raw.as_bytes()))
    }

    /// Complete the exchange: Diffie-Hellman plus HKDF in one step,
    /// returning a 32-byte AES-256-GCM session key bound to both ephemeral
    /// public keys.
    pub fn establish_key(&mut self, peer_public: &[u8; 32]) -> Result<[u8; 32], AgreementError> {
        let our_public = self.public_key.to_bytes();
        let shared = self.diffie_hellman(peer_public)?;
        Ok(session_key(&shared, &our_public, peer_public))
    }
}

impl Default for AgreementSession {
    fn default() -> Self {
        Self::new()
    }
}

/// HKDF-SHA256: extract-then-expand key derivation (RFC 5869).
///
/// * `ikm` — input keying material (e.g. a raw DH output).
/// * `salt` — optional; an empty slice means the zero-length salt of the
///   underlying scheme. Not secret, but adds robustness when available.
/// * `info` — domain-separation context; may be empty, shouldn't be. Two
///   derivations with different `info` never collide.
/// * `out_len` — requested output length; may exceed the hash size (the
///   expand stage runs as many rounds as needed), up to 255 × 32 bytes.
///
/// Pure function of its inputs: identical arguments always produce identical
/// output.
pub fn hkdf_sha256(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    out_len: usize,
) -> Result<Vec<u8>, AgreementError> {
    if out_len > HKDF_MAX_OUTPUT_LENGTH {
        return Err(AgreementError::OutputTooLong { requested: out_len });
    }

    // RFC 5869 defaults an absent salt to HashLen zero bytes; HMAC pads an
    // empty key the same way, so None and an empty slice are equivalent.
    let salt = if salt.is_empty() { None } else { Some(salt) };
    let hk = Hkdf::<Sha256>::new(salt, ikm);

    let mut okm = vec![0u8; out_len];
    hk.expand(info, &mut okm)
        .map_err(|_| AgreementError::OutputTooLong { requested: out_len })?;
    Ok(okm)
}

/// Derive a capsule session key from a shared secret and both public keys.
///
/// Both public keys are folded into the HKDF `info` in canonical
/// (lexicographic) order, so the two sides of the exchange derive the same
/// key regardless of which is "ours" vs "peer" — and a transcript replayed
/// against a different peer derives a different one. The
/// [`CAPSULE_KEY_CONTEXT`] label keeps this derivation from ever colliding
/// with any other use of HKDF in the protocol.
pub fn session_key(
    shared: &SharedSecretBytes,
    our_public: &[u8; 32],
    peer_public: &[u8; 32],
) -> [u8; AES_KEY_LENGTH] {
    let (first, second) = if our_public <= peer_public {
        (our_public, peer_public)
    } else {
        (peer_public, our_public)
    };

    let mut info = Vec::with_capacity(CAPSULE_KEY_CONTEXT.len() + 64);
    info.extend_from_slice(CAPSULE_KEY_CONTEXT);
    info.extend_from_slice(first);
    info.extend_from_slice(second);

    let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut key = [0u8; AES_KEY_LENGTH];
    hk.expand(&info, &mut key)
        .expect("32-byte output is always within the HKDF expansion bound");
    key
}
