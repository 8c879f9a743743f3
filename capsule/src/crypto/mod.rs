//! # Cryptographic Primitives for Lumen Capsules
//!
//! This module is the foundation of everything security-related in the
//! capsule pipeline. Every signature, every digest, every sealed envelope
//! flows through here.
//!
//! No novelty here — every primitive is an audited standard:
//!
//! - **Ed25519** for signatures — fast, deterministic, and nobody has
//!   broken it.
//! - **X25519** for key agreement — ephemeral, one exchange per session.
//! - **AES-256-GCM** for symmetric encryption — hardware-accelerated AEAD
//!   on everything the assistant ships on.
//! - **HKDF-SHA256** for key derivation — extract, then expand.
//! - **SHA-256** for content digests — because the rest of the toolchain
//!   speaks it.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here wraps the RustCrypto and dalek implementations
//! behind types that make misuse awkward. If a function in this module
//! looks like it could be faster, assume it is constant-time on purpose and
//! leave it alone.

pub mod agreement;
pub mod codec;
pub mod encryption;
pub mod hash;
pub mod keys;
pub mod signatures;

// Flat re-exports of the common surface; callers shouldn't have to know
// which file a primitive lives in.
pub use agreement::{hkdf_sha256, session_key, AgreementSession, SharedSecretBytes};
pub use codec::{b64_decode, b64_encode, secure_zero};
pub use encryption::{open, seal, AeadCiphertext};
pub use hash::{sha256, sha256_hex};
pub use keys::{LumenKeypair, LumenPublicKey, LumenSignature};
pub use signatures::{sign, verify};
