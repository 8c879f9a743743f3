//! # Envelope Ingestion Pipeline
//!
//! Turns an untrusted [`SealedCapsule`] plus a claimed sender into a trust
//! decision. Single pass, no retries — each stage is a pure validation gate,
//! and the first failing gate is the verdict.
//!
//! The stages, in order:
//!
//! 1. **Peer lookup** — resolve the claimed sender in the registry. An
//!    unknown peer ends everything before any cryptography runs; we do not
//!    verify signatures against keys we were never given.
//! 2. **Signature check** — Ed25519 over the raw ciphertext bytes. An
//!    envelope that fails here is never decrypted; plaintext is not
//!    recovered for unverified senders, full stop.
//! 3. **Decrypt** — AES-256-GCM under the caller-supplied session key and
//!    associated data.
//! 4. **Content gates** — steganography detection (terminal on a hit) and
//!    sanitization (non-terminal; the cleaned text rides along in the
//!    report).
//!
//! The checks are ordered from cheapest to most expensive AND from
//! least-trusted to most-trusted input: a map lookup gates a signature
//! verification, which gates a decryption, which gates content analysis.

use std::sync::Arc;

use tracing::{info, warn};

use crate::crypto::codec;
use crate::crypto::keys::LumenSignature;
use crate::crypto::{encryption, signatures};
use crate::identity::registry::PeerRegistry;
use crate::ingest::capsule::{Capsule, SealedCapsule};
use crate::ingest::gates::{
    NullDetector, NullSanitizer, SanitizeOutcome, SteganographyDetector, TextSanitizer,
};

/// The outcome of running one sealed capsule through the pipeline.
///
/// `Success` and `SanitizationNeeded` accept the capsule (the latter with
/// rewritten content); every other verdict is terminal and the content is
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestVerdict {
    Success,
    SanitizationNeeded,
    UnknownPeer,
    InvalidSignature,
    DecryptionFailed,
    SteganographyDetected,
}

impl IngestVerdict {
    /// Whether the capsule was accepted into the knowledge store
    /// (possibly after sanitization).
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Success | Self::SanitizationNeeded)
    }
}

/// What the pipeline hands back: verdict, a human-readable line for the
/// audit log, and — only when the verdict accepts — the plaintext capsule.
///
/// `capsule` is `None` on every terminal failure, so "must not consume the
/// content of a rejected envelope" is enforced by the type rather than by a
/// comment.
#[derive(Debug)]
pub struct IngestReport {
    pub verdict: IngestVerdict,
    pub message: String,
    pub capsule: Option<Capsule>,
}

impl IngestReport {
    fn rejected(verdict: IngestVerdict, message: impl Into<String>) -> Self {
        Self {
            verdict,
            message: message.into(),
            capsule: None,
        }
    }
}

/// The ingestion state machine. Construct once, share freely — it holds no
/// per-capsule state, only the registry handle and the two content gates.
pub struct IngestPipeline {
    registry: Arc<PeerRegistry>,
    detector: Box<dyn SteganographyDetector>,
    sanitizer: Box<dyn TextSanitizer>,
}

impl IngestPipeline {
    /// A pipeline with the null content gates — cryptographic validation
    /// only. The shape tests and early integrations want.
    pub fn new(registry: Arc<PeerRegistry>) -> Self {
        Self::with_gates(registry, Box::new(NullDetector), Box::new(NullSanitizer))
    }

    /// A pipeline with real content gates wired in.
    pub fn with_gates(
        registry: Arc<PeerRegistry>,
        detector: Box<dyn SteganographyDetector>,
        sanitizer: Box<dyn TextSanitizer>,
    ) -> Self {
        Self {
            registry,
            detector,
            sanitizer,
        }
    }

    /// Run one sealed capsule through every gate and return the verdict.
    ///
    /// `session_key` is the 32-byte AEAD key agreed with the sender (via the
    /// agreement module or supplied by the session layer); `aad` is whatever
    /// associated data the two sides agreed on — it is never read from the
    /// envelope itself.
    pub fn ingest(&self, sealed: &SealedCapsule, session_key: &[u8], aad: &[u8]) -> IngestReport {
        let capsule_id = sealed.id;
        let peer_id = sealed.sender.as_str();

        // Stage 1: the claimed sender must be a registered peer. No key, no
        // conversation.
        let Some(sender_key) = self.registry.public_key(peer_id) else {
            warn!(%capsule_id, peer_id, "capsule rejected: unknown peer");
            return IngestReport::rejected(
                IngestVerdict::UnknownPeer,
                format!("sender {peer_id:?} is not a registered peer"),
            );
        };

        // Stage 2: the signature must verify over the exact ciphertext
        // bytes. Envelope fields that don't even decode can't have been
        // signed by anyone, so they fail here too.
        let ciphertext = match sealed.ciphertext_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%capsule_id, peer_id, error = %err, "capsule rejected: undecodable ciphertext field");
                return IngestReport::rejected(
                    IngestVerdict::InvalidSignature,
                    "encrypted content field is not valid base64",
                );
            }
        };
        let signature = match LumenSignature::from_b64(&sealed.signature) {
            Ok(sig) => sig,
            Err(err) => {
                warn!(%capsule_id, peer_id, error = %err, "capsule rejected: undecodable signature field");
                return IngestReport::rejected(
                    IngestVerdict::InvalidSignature,
                    "signature field is not a valid base64 Ed25519 signature",
                );
            }
        };
        if !signatures::verify(&sender_key, &ciphertext, &signature) {
            warn!(%capsule_id, peer_id, "capsule rejected: signature does not verify");
            return IngestReport::rejected(
                IngestVerdict::InvalidSignature,
                format!("signature does not verify under the key registered for {peer_id:?}"),
            );
        }

        // Stage 3: decrypt. Nonce/tag decode failures, tag mismatches, and
        // AAD mismatches all land here — to the caller they are one and the
        // same "this envelope does not open".
        let nonce: [u8; 12] = match codec::b64_decode_exact(&sealed.nonce) {
            Ok(n) => n,
            Err(err) => {
                warn!(%capsule_id, peer_id, error = %err, "capsule rejected: malformed nonce field");
                return IngestReport::rejected(
                    IngestVerdict::DecryptionFailed,
                    "nonce field is not a valid 12-byte base64 value",
                );
            }
        };
        let tag: [u8; 16] = match codec::b64_decode_exact(&sealed.tag) {
            Ok(t) => t,
            Err(err) => {
                warn!(%capsule_id, peer_id, error = %err, "capsule rejected: malformed tag field");
                return IngestReport::rejected(
                    IngestVerdict::DecryptionFailed,
                    "tag field is not a valid 16-byte base64 value",
                );
            }
        };
        let plaintext = match encryption::open(session_key, &ciphertext, &tag, &nonce, aad) {
            Ok(p) => p,
            Err(err) => {
                warn!(%capsule_id, peer_id, error = %err, "capsule rejected: decryption failed");
                return IngestReport::rejected(
                    IngestVerdict::DecryptionFailed,
                    "authenticated decryption failed",
                );
            }
        };
        let content = match String::from_utf8(plaintext) {
            Ok(c) => c,
            Err(_) => {
                warn!(%capsule_id, peer_id, "capsule rejected: recovered content is not UTF-8");
                return IngestReport::rejected(
                    IngestVerdict::DecryptionFailed,
                    "recovered content is not valid UTF-8 text",
                );
            }
        };

        // Stage 4a: steganography gate. A hit quarantines the capsule —
        // content discarded, nothing forwarded.
        if self.detector.detect(&content) {
            warn!(%capsule_id, peer_id, "capsule quarantined: steganography suspected");
            return IngestReport::rejected(
                IngestVerdict::SteganographyDetected,
                "hidden payload suspected in capsule content",
            );
        }

        // Stage 4b: sanitizer. Non-terminal — a rewrite rides along in the
        // report and ingestion continues.
        let (verdict, message, final_content) = match self.sanitizer.sanitize(&content) {
            SanitizeOutcome::Clean => (
                IngestVerdict::Success,
                "capsule verified and decrypted".to_string(),
                content,
            ),
            SanitizeOutcome::Rewritten(cleaned) => (
                IngestVerdict::SanitizationNeeded,
                "capsule verified; content required sanitization".to_string(),
                cleaned,
            ),
        };

        let capsule = Capsule {
            id: sealed.id,
            topic: sealed.topic.clone(),
            source: sealed.source.clone(),
            content: final_content,
            embedding: sealed.embedding.clone(),
            created_at: sealed.created_at,
        };
        info!(
            %capsule_id,
            peer_id,
            verdict = ?verdict,
            content_digest = %capsule.content_digest(),
            "capsule ingested"
        );

        IngestReport {
            verdict,
            message,
            capsule: Some(capsule),
        }
    }
}
