//! End-to-end integration tests for the capsule security core.
//!
//! These tests exercise the full envelope lifecycle from identity creation
//! through ingestion verdicts. They prove that the core components compose
//! correctly: keypair generation and persistence, peer registration,
//! ephemeral key agreement, sealing (encrypt-then-sign), and the staged
//! ingestion pipeline.
//!
//! Each test stands alone with its own identities and registry. No shared
//! state, no test ordering dependencies, no flaky failures.

use std::sync::Arc;

use lumen_capsule::crypto::agreement::AgreementSession;
use lumen_capsule::crypto::codec;
use lumen_capsule::crypto::keys::LumenKeypair;
use lumen_capsule::identity::{IdentityPaths, KeyManager, PeerRegistry};
use lumen_capsule::ingest::{
    Capsule, IngestPipeline, IngestVerdict, SanitizeOutcome, SealedCapsule,
    SteganographyDetector, TextSanitizer,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Runs an ephemeral X25519 exchange and returns both sides' session keys
/// (which had better be equal).
fn establish_session() -> ([u8; 32], [u8; 32]) {
    let mut producer = AgreementSession::new();
    let mut consumer = AgreementSession::new();

    let producer_pub = producer.public_key_bytes();
    let consumer_pub = consumer.public_key_bytes();

    let producer_key = producer.establish_key(&consumer_pub).unwrap();
    let consumer_key = consumer.establish_key(&producer_pub).unwrap();
    (producer_key, consumer_key)
}

/// A consumer-side setup: a registry with one registered mentor and a
/// pipeline over it.
fn consumer_for(peer_id: &str, peer_keypair: &LumenKeypair) -> IngestPipeline {
    let registry = Arc::new(PeerRegistry::new());
    registry
        .register(
            peer_id,
            &peer_keypair.public_key().to_public_key_pem().unwrap(),
        )
        .unwrap();
    IngestPipeline::new(registry)
}

// ---------------------------------------------------------------------------
// 1. Full capsule lifecycle
// ---------------------------------------------------------------------------

#[test]
fn full_capsule_lifecycle() {
    // Producer and consumer each hold an identity.
    let producer = KeyManager::new();
    producer.generate_or_load(None).unwrap();

    // The consumer registers the producer as a known mentor.
    let registry = Arc::new(PeerRegistry::new());
    registry
        .register("mentor-alice", &producer.public_key_pem().unwrap())
        .unwrap();

    // Forward-secret session key via ephemeral agreement.
    let (producer_key, consumer_key) = establish_session();
    assert_eq!(producer_key, consumer_key);

    // Producer seals a capsule.
    let capsule = Capsule::new(
        "chemistry/equilibrium",
        "mentor-alice",
        "Le Chatelier: a disturbed equilibrium shifts to counteract the change.",
    );
    let aad = capsule.topic.as_bytes().to_vec();
    let sealed_json = {
        let sealed = producer
            .seal_capsule(&capsule, "mentor-alice", &producer_key, &aad)
            .unwrap();
        serde_json::to_string(&sealed).unwrap()
    };

    // The ciphertext crosses the wire as JSON and never contains plaintext.
    assert!(!sealed_json.contains("Le Chatelier"));

    // Consumer ingests.
    let sealed: SealedCapsule = serde_json::from_str(&sealed_json).unwrap();
    let report = IngestPipeline::new(registry).ingest(&sealed, &consumer_key, &aad);

    assert_eq!(report.verdict, IngestVerdict::Success);
    let ingested = report.capsule.unwrap();
    assert_eq!(ingested.content, capsule.content);
    assert_eq!(ingested.id, capsule.id);
    assert_eq!(ingested.content_digest(), capsule.content_digest());
}

// ---------------------------------------------------------------------------
// 2. Identity persistence
// ---------------------------------------------------------------------------

#[test]
fn persisted_identity_still_verifies_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let paths = IdentityPaths::in_dir(dir.path());

    // Session one: establish, persist, seal a capsule.
    let capsule = Capsule::new("history/rome", "mentor-alice", "Carthago delenda est.");
    let session_key = [0x5Au8; 32];
    let sealed = {
        let manager = KeyManager::new();
        manager.generate_or_load(Some(&paths)).unwrap();
        manager
            .seal_capsule(&capsule, "mentor-alice", &session_key, b"")
            .unwrap()
    };

    // Session two: reload the identity from disk; the reloaded public key
    // must verify envelopes produced before the "restart".
    let reloaded = KeyManager::new();
    reloaded.generate_or_load(Some(&paths)).unwrap();

    let registry = Arc::new(PeerRegistry::new());
    registry
        .register("mentor-alice", &reloaded.public_key_pem().unwrap())
        .unwrap();

    let report = IngestPipeline::new(registry).ingest(&sealed, &session_key, b"");
    assert_eq!(report.verdict, IngestVerdict::Success);
    assert_eq!(report.capsule.unwrap().content, "Carthago delenda est.");
}

// ---------------------------------------------------------------------------
// 3. Pipeline ordering scenarios
// ---------------------------------------------------------------------------

#[test]
fn unknown_peer_wins_even_when_everything_else_is_valid() {
    // The envelope is decryptable with a key we hold and the signature is
    // genuine — but the sender was never registered. Peer lookup gates the
    // cryptography, not the other way around.
    let keypair = LumenKeypair::generate();
    let session_key = [0x11u8; 32];
    let capsule = Capsule::new("t", "s", "perfectly fine content");
    let sealed = SealedCapsule::seal(&capsule, "stranger", &session_key, b"", &keypair).unwrap();

    let pipeline = IngestPipeline::new(Arc::new(PeerRegistry::new()));
    let report = pipeline.ingest(&sealed, &session_key, b"");

    assert_eq!(report.verdict, IngestVerdict::UnknownPeer);
    assert!(report.capsule.is_none());
}

#[test]
fn ciphertext_altered_after_signing_is_an_invalid_signature() {
    // Encrypt-then-sign: the signature covers the ciphertext, so post-hoc
    // tampering with the ciphertext dies at the signature stage — the
    // AEAD never even runs.
    let keypair = LumenKeypair::generate();
    let session_key = [0x22u8; 32];
    let capsule = Capsule::new("t", "s", "original");
    let mut sealed = SealedCapsule::seal(&capsule, "mentor-alice", &session_key, b"", &keypair).unwrap();

    let mut ciphertext = sealed.ciphertext_bytes().unwrap();
    let last = ciphertext.len() - 1;
    ciphertext[last] ^= 0x80;
    sealed.encrypted_content = codec::b64_encode(&ciphertext);

    let pipeline = consumer_for("mentor-alice", &keypair);
    let report = pipeline.ingest(&sealed, &session_key, b"");
    assert_eq!(report.verdict, IngestVerdict::InvalidSignature);
}

#[test]
fn aad_mismatch_is_a_decryption_failure() {
    let keypair = LumenKeypair::generate();
    let session_key = [0x33u8; 32];
    let capsule = Capsule::new("t", "s", "content");
    let sealed =
        SealedCapsule::seal(&capsule, "mentor-alice", &session_key, b"agreed-aad", &keypair)
            .unwrap();

    let pipeline = consumer_for("mentor-alice", &keypair);
    let report = pipeline.ingest(&sealed, &session_key, b"some-other-aad");
    assert_eq!(report.verdict, IngestVerdict::DecryptionFailed);
    assert!(report.capsule.is_none());
}

#[test]
fn stale_session_key_is_a_decryption_failure() {
    // Same peers, new session: a capsule sealed under last session's key
    // does not open under this session's key. That asymmetry is forward
    // secrecy doing its job.
    let keypair = LumenKeypair::generate();
    let (old_key, _) = establish_session();
    let (new_key, _) = establish_session();
    assert_ne!(old_key, new_key);

    let capsule = Capsule::new("t", "s", "from a previous session");
    let sealed = SealedCapsule::seal(&capsule, "mentor-alice", &old_key, b"", &keypair).unwrap();

    let pipeline = consumer_for("mentor-alice", &keypair);
    let report = pipeline.ingest(&sealed, &new_key, b"");
    assert_eq!(report.verdict, IngestVerdict::DecryptionFailed);
}

// ---------------------------------------------------------------------------
// 4. Content gates
// ---------------------------------------------------------------------------

/// A small but honest detector: flags content with zero-width characters
/// above a threshold.
struct ZeroWidthDetector;

impl SteganographyDetector for ZeroWidthDetector {
    fn detect(&self, content: &str) -> bool {
        content.chars().filter(|c| *c == '\u{200b}').count() > 3
    }
}

/// Strips zero-width characters, reporting a rewrite when any were present.
struct ZeroWidthScrubber;

impl TextSanitizer for ZeroWidthScrubber {
    fn sanitize(&self, content: &str) -> SanitizeOutcome {
        if content.contains('\u{200b}') {
            SanitizeOutcome::Rewritten(content.replace('\u{200b}', ""))
        } else {
            SanitizeOutcome::Clean
        }
    }
}

#[test]
fn light_zero_width_contamination_is_sanitized_and_accepted() {
    let keypair = LumenKeypair::generate();
    let session_key = [0x44u8; 32];
    let capsule = Capsule::new("t", "s", "tid\u{200b}y this up");
    let sealed = SealedCapsule::seal(&capsule, "mentor-alice", &session_key, b"", &keypair).unwrap();

    let registry = Arc::new(PeerRegistry::new());
    registry
        .register(
            "mentor-alice",
            &keypair.public_key().to_public_key_pem().unwrap(),
        )
        .unwrap();
    let pipeline = IngestPipeline::with_gates(
        registry,
        Box::new(ZeroWidthDetector),
        Box::new(ZeroWidthScrubber),
    );

    let report = pipeline.ingest(&sealed, &session_key, b"");
    assert_eq!(report.verdict, IngestVerdict::SanitizationNeeded);
    assert_eq!(report.capsule.unwrap().content, "tidy this up");
}

#[test]
fn heavy_zero_width_contamination_is_quarantined() {
    let keypair = LumenKeypair::generate();
    let session_key = [0x44u8; 32];
    let capsule = Capsule::new(
        "t",
        "s",
        "h\u{200b}i\u{200b}d\u{200b}d\u{200b}e\u{200b}n payload",
    );
    let sealed = SealedCapsule::seal(&capsule, "mentor-alice", &session_key, b"", &keypair).unwrap();

    let registry = Arc::new(PeerRegistry::new());
    registry
        .register(
            "mentor-alice",
            &keypair.public_key().to_public_key_pem().unwrap(),
        )
        .unwrap();
    let pipeline = IngestPipeline::with_gates(
        registry,
        Box::new(ZeroWidthDetector),
        Box::new(ZeroWidthScrubber),
    );

    let report = pipeline.ingest(&sealed, &session_key, b"");
    assert_eq!(report.verdict, IngestVerdict::SteganographyDetected);
    assert!(report.capsule.is_none());
}

// ---------------------------------------------------------------------------
// 5. Two-way exchange
// ---------------------------------------------------------------------------

#[test]
fn two_peers_exchange_capsules_both_directions() {
    let alice = KeyManager::new();
    let bob = KeyManager::new();
    alice.generate_or_load(None).unwrap();
    bob.generate_or_load(None).unwrap();

    // Mutual registration through each side's own registry.
    alice
        .register_peer("bob", &bob.public_key_pem().unwrap())
        .unwrap();
    bob.register_peer("alice", &alice.public_key_pem().unwrap())
        .unwrap();

    let (key_a, key_b) = establish_session();

    // Alice -> Bob.
    let to_bob = Capsule::new("physics", "alice", "F = ma, and that's most of mechanics");
    let sealed = alice.seal_capsule(&to_bob, "alice", &key_a, b"").unwrap();
    let report = IngestPipeline::new(bob.registry()).ingest(&sealed, &key_b, b"");
    assert_eq!(report.verdict, IngestVerdict::Success);

    // Bob -> Alice.
    let to_alice = Capsule::new("physics", "bob", "except when it isn't: see relativity");
    let sealed = bob.seal_capsule(&to_alice, "bob", &key_b, b"").unwrap();
    let report = IngestPipeline::new(alice.registry()).ingest(&sealed, &key_a, b"");
    assert_eq!(report.verdict, IngestVerdict::Success);

    // Bob cannot impersonate Alice: a capsule claiming to be from "alice"
    // but signed by Bob fails signature verification on Bob's own consumer.
    let forged = Capsule::new("physics", "alice", "trust me, I'm alice");
    let sealed = bob.seal_capsule(&forged, "alice", &key_b, b"").unwrap();
    let report = IngestPipeline::new(bob.registry()).ingest(&sealed, &key_b, b"");
    assert_eq!(report.verdict, IngestVerdict::InvalidSignature);
}
