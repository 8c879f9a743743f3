//! # Capsules and Sealed Envelopes
//!
//! A capsule is one unit of knowledge — a chunk of study content plus the
//! metadata the assistant needs to file it (topic, source, embedding). On
//! the wire between peers it travels as a [`SealedCapsule`]: same metadata,
//! but the content replaced by an encrypt-then-sign envelope.
//!
//! ## Envelope order
//!
//! Content is AEAD-encrypted first, then the producer's identity key signs
//! the raw ciphertext bytes. Encrypt-then-sign means a verifier learns
//! nothing about the plaintext while checking authorship, and the ingestion
//! pipeline can reject a forged envelope before ever running decryption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::codec;
use crate::crypto::encryption::{self, EncryptionError};
use crate::crypto::hash;
use crate::crypto::keys::LumenKeypair;

/// A plaintext unit of knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    pub id: Uuid,
    /// Topic label, e.g. "biology/photosynthesis".
    pub topic: String,
    /// Where the content came from (peer id, document name, "manual").
    pub source: String,
    /// The content itself. Untrusted until it has passed ingestion.
    pub content: String,
    /// Embedding vector for the semantic store. Opaque to this crate.
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl Capsule {
    /// A fresh capsule with a random id and the current timestamp.
    pub fn new(
        topic: impl Into<String>,
        source: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            source: source.into(),
            content: content.into(),
            embedding: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// SHA-256 digest of the content, lowercase hex. This is what ingestion
    /// logs instead of the content itself.
    pub fn content_digest(&self) -> String {
        hash::sha256_hex(self.content.as_bytes())
    }
}

/// A capsule as it travels between peers: metadata in the clear, content
/// sealed in an AEAD envelope, the whole thing signed by the sender.
///
/// Wire field names (`encryption_iv`, `gcm_tag`) match the envelope format
/// the wider Lumen toolchain already exchanges; each binary field is base64
/// on its own. The associated data used for the AEAD is *not* a field —
/// both sides agree on it out-of-band or derive it from other fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedCapsule {
    pub id: Uuid,
    /// Claimed sender. Resolved against the peer registry at ingest time;
    /// the claim is only as good as the signature that backs it.
    pub sender: String,
    pub topic: String,
    pub source: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    /// Base64 AEAD ciphertext of the content.
    pub encrypted_content: String,
    /// Base64 96-bit AEAD nonce.
    #[serde(rename = "encryption_iv")]
    pub nonce: String,
    /// Base64 128-bit authentication tag.
    #[serde(rename = "gcm_tag")]
    pub tag: String,
    /// Base64 Ed25519 signature over the raw ciphertext bytes.
    pub signature: String,
}

impl SealedCapsule {
    /// Seal a capsule for transport: AEAD-encrypt the content under
    /// `session_key`/`aad`, then sign the ciphertext with the sender's
    /// identity key.
    pub fn seal(
        capsule: &Capsule,
        sender: impl Into<String>,
        session_key: &[u8],
        aad: &[u8],
        keypair: &LumenKeypair,
    ) -> Result<Self, EncryptionError> {
        let sealed = encryption::seal(session_key, capsule.content.as_bytes(), aad)?;
        let signature = keypair.sign(&sealed.ciphertext);

        Ok(Self {
            id: capsule.id,
            sender: sender.into(),
            topic: capsule.topic.clone(),
            source: capsule.source.clone(),
            embedding: capsule.embedding.clone(),
            created_at: capsule.created_at,
            encrypted_content: sealed.ciphertext_b64(),
            nonce: sealed.nonce_b64(),
            tag: sealed.tag_b64(),
            signature: signature.to_b64(),
        })
    }

    /// The decoded ciphertext bytes — the exact message the signature
    /// covers.
    pub fn ciphertext_bytes(&self) -> Result<Vec<u8>, codec::CodecError> {
        codec::b64_decode(&self.encrypted_content)
    }
}
