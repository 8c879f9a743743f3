//! Interactive CLI demo of the capsule security lifecycle.
//!
//! Walks through identity creation, peer registration, ephemeral key
//! agreement, sealing a capsule, ingesting it, and what happens when an
//! attacker tampers with the envelope. The output uses ANSI escape codes
//! for colored, storytelling-style terminal rendering.
//!
//! Run with:
//!   cargo run --example demo --release

use std::sync::Arc;

use lumen_capsule::crypto::agreement::AgreementSession;
use lumen_capsule::crypto::codec;
use lumen_capsule::identity::{KeyManager, PeerRegistry};
use lumen_capsule::ingest::{Capsule, IngestPipeline, IngestVerdict};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!("{BG_BLUE}{BOLD}{WHITE}                                                            {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    LUMEN CAPSULE  --  Secure Envelope Walkthrough          {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    Ed25519 + X25519/HKDF-SHA256 + AES-256-GCM              {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}                                                            {RESET}");
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]========================================================{RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
    println!("{CYAN}----------------------------------------------------------------{RESET}");
}

fn detail(text: &str) {
    println!("{DIM}{CYAN}  >> {text}{RESET}");
}

fn verdict_line(verdict: IngestVerdict, message: &str) {
    let color = if verdict.is_accepted() { GREEN } else { RED };
    println!("  {color}{BOLD}{verdict:?}{RESET} {DIM}{message}{RESET}");
}

fn main() {
    banner();

    // Step 1: identities.
    section(1, "Identity creation");
    let alice = KeyManager::new();
    let bob = KeyManager::new();
    alice.generate_or_load(None).expect("alice identity");
    bob.generate_or_load(None).expect("bob identity");
    detail(&format!(
        "alice identity: {}",
        &alice.public_key().unwrap().to_hex()[..16]
    ));
    detail(&format!(
        "bob identity:   {}",
        &bob.public_key().unwrap().to_hex()[..16]
    ));

    // Step 2: peer registration, the explicit trust step.
    section(2, "Peer registration");
    let registry: Arc<PeerRegistry> = bob.registry();
    registry
        .register("mentor-alice", &alice.public_key_pem().unwrap())
        .expect("register alice");
    detail("bob registered mentor-alice's public key");
    detail(&format!("registry now knows {} peer(s)", registry.len()));

    // Step 3: ephemeral key agreement.
    section(3, "Forward-secret session key (X25519 + HKDF-SHA256)");
    let mut alice_session = AgreementSession::new();
    let mut bob_session = AgreementSession::new();
    let alice_pub = alice_session.public_key_bytes();
    let bob_pub = bob_session.public_key_bytes();
    let alice_key = alice_session.establish_key(&bob_pub).expect("alice key");
    let bob_key = bob_session.establish_key(&alice_pub).expect("bob key");
    assert_eq!(alice_key, bob_key);
    detail("both sides derived the same 32-byte session key");
    detail("ephemeral secrets are already gone -- that's the forward secrecy");

    // Step 4: seal a capsule.
    section(4, "Sealing (encrypt, then sign the ciphertext)");
    let capsule = Capsule::new(
        "biology/photosynthesis",
        "mentor-alice",
        "Light reactions split water; the Calvin cycle fixes carbon.",
    );
    let aad = capsule.topic.as_bytes().to_vec();
    let sealed = alice
        .seal_capsule(&capsule, "mentor-alice", &alice_key, &aad)
        .expect("seal");
    detail(&format!("capsule id:       {}", sealed.id));
    detail(&format!("ciphertext (b64): {}...", &sealed.encrypted_content[..24]));
    detail(&format!("signature  (b64): {}...", &sealed.signature[..24]));

    // Step 5: ingest it.
    section(5, "Ingestion (peer -> signature -> decrypt -> gates)");
    let pipeline = IngestPipeline::new(Arc::clone(&registry));
    let report = pipeline.ingest(&sealed, &bob_key, &aad);
    verdict_line(report.verdict, &report.message);
    if let Some(ingested) = &report.capsule {
        detail(&format!("recovered content: {:?}", ingested.content));
        detail(&format!("content digest:    {}", ingested.content_digest()));
    }

    // Step 6: what tampering looks like.
    section(6, "Tampering with the ciphertext after signing");
    let mut tampered = sealed.clone();
    let mut ciphertext = tampered.ciphertext_bytes().expect("decode");
    ciphertext[0] ^= 0x01;
    tampered.encrypted_content = codec::b64_encode(&ciphertext);
    let report = pipeline.ingest(&tampered, &bob_key, &aad);
    verdict_line(report.verdict, &report.message);
    detail("the signature covers the ciphertext, so the forgery dies before decryption");

    // Step 7: unknown peers get nowhere.
    section(7, "An unregistered sender");
    let mut unknown = sealed.clone();
    unknown.sender = "stranger-danger".to_string();
    let report = pipeline.ingest(&unknown, &bob_key, &aad);
    verdict_line(report.verdict, &report.message);
    detail("no registry entry, no cryptography: the capsule is rejected at the door");

    println!();
    println!("{GREEN}{BOLD}  Done. The knowledge store only ever saw the verified capsule.{RESET}");
    println!();
}
