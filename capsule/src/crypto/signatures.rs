//! # Digital Signatures
//!
//! Ed25519 signing and verification — the backbone of capsule authentication.
//!
//! Every sealed capsule carries a signature over its encrypted-content bytes,
//! and every ingestion decision starts by checking one. This module provides
//! the byte-level primitives plus the string conveniences (base64 signatures,
//! PEM keys) that the envelope layer composes from them.
//!
//! ## Strictness
//!
//! Verification is fail-closed. A malformed key, a truncated signature, an
//! engine error deep inside the curve arithmetic — all of it is "not
//! verified." There is no code path from an internal failure to `true`.
//! The string conveniences add exactly zero leniency on top of the byte
//! primitives: no trimming, no re-encoding, no second-guessing the caller.

use super::keys::{LumenKeypair, LumenPublicKey, LumenSignature};

/// Sign a message using a Lumen keypair.
///
/// Produces a 64-byte Ed25519 signature over the exact byte sequence given —
/// no implicit hashing pre-step beyond what Ed25519 itself defines. The
/// signature is deterministic for a given (key, message) pair.
pub fn sign(keypair: &LumenKeypair, message: &[u8]) -> LumenSignature {
    keypair.sign(message)
}

/// Verify an Ed25519 signature over `message` under `public_key`.
///
/// Returns `true` if the signature is valid, `false` otherwise. We
/// intentionally don't distinguish between "invalid signature" and "wrong
/// public key" — both are just "nope." Giving attackers a detailed error
/// oracle is a bad idea.
pub fn verify(public_key: &LumenPublicKey, message: &[u8], signature: &LumenSignature) -> bool {
    public_key.verify(message, signature)
}

/// Sign a message and return the signature in base64 transport form.
///
/// Composes [`sign`] with the codec layer — this is what populates the
/// `signature` field of a sealed capsule.
pub fn sign_b64(keypair: &LumenKeypair, message: &[u8]) -> String {
    sign(keypair, message).to_b64()
}

/// Verify a base64-encoded signature under a PEM-encoded public key.
///
/// The string-convenience twin of [`verify`]: decodes both inputs with the
/// same strictness the byte-level paths use, then delegates. Any decode
/// failure is logged at debug level and treated as "not verified" — the
/// caller gets `false`, never a default-true, never a panic.
pub fn verify_b64(public_key_pem: &str, message: &[u8], signature_b64: &str) -> bool {
    let public_key = match LumenPublicKey::from_public_key_pem(public_key_pem) {
        Ok(pk) => pk,
        Err(err) => {
            tracing::debug!(error = %err, "signature check failed: unparseable public key PEM");
            return false;
        }
    };
    let signature = match LumenSignature::from_b64(signature_b64) {
        Ok(sig) => sig,
        Err(err) => {
            tracing::debug!(error = %err, "signature check failed: unparseable signature");
            return false;
        }
    };
    verify(&public_key, message, &signature)
}
