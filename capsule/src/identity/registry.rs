//! # Peer Registry
//!
//! The mapping from peer identifier to public signing key. A peer is
//! "known" if and only if someone explicitly registered it here — there are
//! no implicit entries, no directory lookups, no fallbacks.
//!
//! ## On lookup misses
//!
//! A miss is an explicit `None`. This registry never hands back placeholder
//! or default key material: verifying a signature against a fabricated key
//! and then trusting the result is how you turn a lookup bug into a
//! security hole. The ingestion pipeline maps `None` straight to an
//! `UnknownPeer` verdict before any cryptography runs.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{info, warn};

use crate::crypto::keys::{KeyError, LumenPublicKey};

/// Errors raised while registering a peer.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("refusing to register peer {peer_id:?} with an empty public key PEM")]
    EmptyPem { peer_id: String },

    #[error("public key PEM for peer {peer_id:?} does not parse")]
    BadPeerKey {
        peer_id: String,
        #[source]
        source: KeyError,
    },
}

/// Process-lifetime map from peer id to PEM-encoded public signing key.
///
/// Shared across components by `Arc`; reads and writes are serialized by an
/// interior read/write lock, so concurrent registration and lookup are safe.
/// Registration validates the PEM up front — garbage never enters the map,
/// which means a later lookup hit is always a parseable key.
pub struct PeerRegistry {
    peers: RwLock<HashMap<String, String>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Store or overwrite the public key for a peer.
    ///
    /// Rejects empty and unparseable PEM input; the map is untouched on
    /// failure. Overwriting an existing entry is allowed and logged — key
    /// rotation policy lives with the caller, not here.
    pub fn register(&self, peer_id: &str, public_key_pem: &str) -> Result<(), RegistryError> {
        if public_key_pem.trim().is_empty() {
            warn!(peer_id, "peer registration rejected: empty public key PEM");
            return Err(RegistryError::EmptyPem {
                peer_id: peer_id.to_string(),
            });
        }

        if let Err(source) = LumenPublicKey::from_public_key_pem(public_key_pem) {
            warn!(peer_id, error = %source, "peer registration rejected: unparseable public key PEM");
            return Err(RegistryError::BadPeerKey {
                peer_id: peer_id.to_string(),
                source,
            });
        }

        let replaced = self
            .peers
            .write()
            .insert(peer_id.to_string(), public_key_pem.to_string());

        if replaced.is_some() {
            info!(peer_id, "peer public key replaced");
        } else {
            info!(peer_id, "peer registered");
        }
        Ok(())
    }

    /// Look up a peer's public key PEM. `None` means unknown peer — never a
    /// placeholder.
    pub fn public_key_pem(&self, peer_id: &str) -> Option<String> {
        self.peers.read().get(peer_id).cloned()
    }

    /// Look up and parse a peer's public key.
    ///
    /// Registration pre-validates every entry, so a hit always parses; the
    /// `Option` covers only the unknown-peer case.
    pub fn public_key(&self, peer_id: &str) -> Option<LumenPublicKey> {
        let pem = self.public_key_pem(peer_id)?;
        LumenPublicKey::from_public_key_pem(&pem).ok()
    }

    pub fn contains(&self, peer_id: &str) -> bool {
        self.peers.read().contains_key(peer_id)
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Snapshot of the registered peer ids, for diagnostics.
    pub fn peer_ids(&self) -> Vec<String> {
        self.peers.read().keys().cloned().collect()
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::LumenKeypair;

    fn pem_for(kp: &LumenKeypair) -> String {
        kp.public_key().to_public_key_pem().unwrap()
    }

    #[test]
    fn register_and_lookup() {
        let registry = PeerRegistry::new();
        let kp = LumenKeypair::generate();
        registry.register("mentor-alice", &pem_for(&kp)).unwrap();

        assert!(registry.contains("mentor-alice"));
        assert_eq!(registry.public_key_pem("mentor-alice").unwrap(), pem_for(&kp));
        assert_eq!(registry.public_key("mentor-alice").unwrap(), kp.public_key());
    }

    #[test]
    fn unknown_peer_is_none() {
        // The load-bearing contract: a miss is None, never fabricated key
        // material.
        let registry = PeerRegistry::new();
        assert!(registry.public_key_pem("nobody").is_none());
        assert!(registry.public_key("nobody").is_none());
    }

    #[test]
    fn register_overwrites() {
        let registry = PeerRegistry::new();
        let old = LumenKeypair::generate();
        let new = LumenKeypair::generate();

        registry.register("peer", &pem_for(&old)).unwrap();
        registry.register("peer", &pem_for(&new)).unwrap();

        assert_eq!(registry.public_key("peer").unwrap(), new.public_key());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_pem_rejected() {
        let registry = PeerRegistry::new();
        assert!(matches!(
            registry.register("peer", ""),
            Err(RegistryError::EmptyPem { .. })
        ));
        assert!(matches!(
            registry.register("peer", "   \n"),
            Err(RegistryError::EmptyPem { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn garbage_pem_rejected() {
        let registry = PeerRegistry::new();
        assert!(matches!(
            registry.register("peer", "definitely not a pem"),
            Err(RegistryError::BadPeerKey { .. })
        ));
        assert!(!registry.contains("peer"));
    }

    #[test]
    fn private_key_pem_rejected() {
        // Someone pasting a PRIVATE KEY block into a peer registration is a
        // mistake worth failing loudly on.
        let registry = PeerRegistry::new();
        let kp = LumenKeypair::generate();
        let private_pem = kp.to_pkcs8_pem().unwrap();
        assert!(registry.register("peer", &private_pem).is_err());
    }

    #[test]
    fn peer_ids_snapshot() {
        let registry = PeerRegistry::new();
        registry
            .register("a", &pem_for(&LumenKeypair::generate()))
            .unwrap();
        registry
            .register("b", &pem_for(&LumenKeypair::generate()))
            .unwrap();

        let mut ids = registry.peer_ids();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn concurrent_register_and_lookup() {
        use std::sync::Arc;

        let registry = Arc::new(PeerRegistry::new());
        let pem = pem_for(&LumenKeypair::generate());

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let pem = pem.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        registry.register(&format!("peer-{i}-{j}"), &pem).unwrap();
                    }
                })
            })
            .collect();

        for handle in writers {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 200);
    }
}
