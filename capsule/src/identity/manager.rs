//! # Identity Key Manager
//!
//! Owns the process's long-term Ed25519 identity and the registry of peer
//! public keys. There is exactly one identity per `KeyManager`, established
//! once — either loaded from a pair of PEM files or generated fresh — and
//! held for the life of the process.
//!
//! ## Lifecycle
//!
//! [`KeyManager::generate_or_load`] is the only way an identity comes into
//! existence. If both persisted files exist and parse as a matching pair,
//! they are loaded; anything short of that (missing files, malformed PEM, a
//! public key that doesn't match the private half) is recoverable and falls
//! through to fresh generation, with the new identity persisted back when
//! paths were supplied. Only keypair generation itself is fatal — and
//! generation doesn't fail on a working OS.
//!
//! ## Locking
//!
//! The identity slot sits behind a read/write lock. Disk I/O for the
//! one-time load/persist happens *before* the write lock is taken, so a
//! concurrent caller is never blocked on the filesystem; the loser of a
//! racing establishment simply adopts the winner's identity.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::config::{DEFAULT_PRIVATE_KEY_FILE, DEFAULT_PUBLIC_KEY_FILE};
use crate::crypto::agreement::AgreementSession;
use crate::crypto::encryption::EncryptionError;
use crate::crypto::keys::{KeyError, LumenKeypair, LumenPublicKey, LumenSignature};
use crate::identity::registry::{PeerRegistry, RegistryError};
use crate::ingest::capsule::{Capsule, SealedCapsule};

/// Errors from identity lifecycle and accessor operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No identity has been established yet. Callers must treat this as
    /// "no identity", never as a valid empty key.
    #[error("identity not established: call generate_or_load first")]
    NotEstablished,

    #[error("identity file I/O failed")]
    Io(#[from] std::io::Error),

    #[error("identity key error")]
    Key(#[from] KeyError),

    #[error("persisted public key does not match the private key")]
    KeyPairMismatch,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("capsule sealing failed")]
    Seal(#[from] EncryptionError),
}

/// The pair of on-disk locations for a persisted identity.
#[derive(Debug, Clone)]
pub struct IdentityPaths {
    /// PKCS#8 PEM file holding the private signing key.
    pub private_pem: PathBuf,
    /// SPKI PEM file holding the public key.
    pub public_pem: PathBuf,
}

impl IdentityPaths {
    pub fn new(private_pem: impl Into<PathBuf>, public_pem: impl Into<PathBuf>) -> Self {
        Self {
            private_pem: private_pem.into(),
            public_pem: public_pem.into(),
        }
    }

    /// The conventional file names inside a data directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            private_pem: dir.join(DEFAULT_PRIVATE_KEY_FILE),
            public_pem: dir.join(DEFAULT_PUBLIC_KEY_FILE),
        }
    }
}

/// Holder of the process identity keypair and the peer registry.
///
/// The registry is exposed as an `Arc` so other components (notably the
/// ingestion pipeline) can share it directly instead of going through a
/// process-wide singleton.
pub struct KeyManager {
    identity: RwLock<Option<LumenKeypair>>,
    registry: Arc<PeerRegistry>,
}

impl KeyManager {
    /// A manager with no identity and an empty peer registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(PeerRegistry::new()))
    }

    /// A manager sharing an existing peer registry.
    pub fn with_registry(registry: Arc<PeerRegistry>) -> Self {
        Self {
            identity: RwLock::new(None),
            registry,
        }
    }

    /// Establish the process identity: load it from `paths` if possible,
    /// generate (and persist) otherwise.
    ///
    /// Idempotent — once an identity exists, later calls return its public
    /// key without touching the disk. With `paths == None` the identity is
    /// memory-only, which is what tests and throwaway sessions want.
    pub fn generate_or_load(
        &self,
        paths: Option<&IdentityPaths>,
    ) -> Result<LumenPublicKey, IdentityError> {
        if let Some(existing) = &*self.identity.read() {
            debug!("identity already established, reusing");
            return Ok(existing.public_key());
        }

        // All disk work happens before the write lock below.
        let loaded = paths.and_then(|p| match Self::try_load(p) {
            Ok(keypair) => {
                info!(
                    public_key = %keypair.public_key_hex(),
                    "identity loaded from disk"
                );
                Some(keypair)
            }
            Err(err) => {
                // Recoverable by design: a half-written or corrupted
                // identity falls through to regeneration.
                warn!(error = %err, "persisted identity unusable, generating a fresh one");
                None
            }
        });

        let keypair = match loaded {
            Some(keypair) => keypair,
            None => {
                let keypair = LumenKeypair::generate();
                if let Some(p) = paths {
                    Self::persist(&keypair, p)?;
                }
                info!(
                    public_key = %keypair.public_key_hex(),
                    persisted = paths.is_some(),
                    "generated fresh identity"
                );
                keypair
            }
        };

        let mut slot = self.identity.write();
        if let Some(winner) = &*slot {
            // Another thread established an identity while we were on disk;
            // adopt theirs and discard ours.
            return Ok(winner.public_key());
        }
        let public = keypair.public_key();
        *slot = Some(keypair);
        Ok(public)
    }

    fn try_load(paths: &IdentityPaths) -> Result<LumenKeypair, IdentityError> {
        let private_pem = fs::read_to_string(&paths.private_pem)?;
        let public_pem = fs::read_to_string(&paths.public_pem)?;

        let keypair = LumenKeypair::from_pkcs8_pem(&private_pem)?;
        let public = LumenPublicKey::from_public_key_pem(&public_pem)?;

        // The two halves are only ever written together; if they disagree,
        // someone edited one of the files and neither can be trusted.
        if keypair.public_key() != public {
            return Err(IdentityError::KeyPairMismatch);
        }
        Ok(keypair)
    }

    fn persist(keypair: &LumenKeypair, paths: &IdentityPaths) -> Result<(), IdentityError> {
        let private_pem = keypair.to_pkcs8_pem()?;
        let public_pem = keypair.public_key().to_public_key_pem()?;

        if let Some(parent) = paths.private_pem.parent() {
            fs::create_dir_all(parent)?;
        }
        if let Some(parent) = paths.public_pem.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&paths.private_pem, private_pem.as_bytes())?;
        #[cfg(unix)]
        {
            // The private half must not be group/world readable.
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&paths.private_pem, fs::Permissions::from_mode(0o600))?;
        }
        fs::write(&paths.public_pem, public_pem.as_bytes())?;

        info!(
            private_path = %paths.private_pem.display(),
            public_path = %paths.public_pem.display(),
            "identity persisted"
        );
        Ok(())
    }

    /// Whether an identity has been established.
    pub fn is_established(&self) -> bool {
        self.identity.read().is_some()
    }

    /// The identity's public key.
    pub fn public_key(&self) -> Result<LumenPublicKey, IdentityError> {
        self.with_identity("public_key", LumenKeypair::public_key)
    }

    /// The identity's public key as SPKI PEM — what you hand to a peer
    /// registering us.
    pub fn public_key_pem(&self) -> Result<String, IdentityError> {
        self.with_identity("public_key_pem", |kp| kp.public_key().to_public_key_pem())?
            .map_err(IdentityError::Key)
    }

    /// The identity's private key as PKCS#8 PEM, zeroized when dropped.
    ///
    /// Exists for explicit export/backup flows only. Nothing in the capsule
    /// pipeline itself needs this.
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, IdentityError> {
        self.with_identity("private_key_pem", LumenKeypair::to_pkcs8_pem)?
            .map_err(IdentityError::Key)
    }

    /// Sign a message with the identity key.
    pub fn sign(&self, message: &[u8]) -> Result<LumenSignature, IdentityError> {
        self.with_identity("sign", |kp| kp.sign(message))
    }

    /// Seal a capsule for transport under this identity: AEAD-encrypt the
    /// content, then sign the ciphertext. Convenience over
    /// [`SealedCapsule::seal`] for callers that hold a manager rather than
    /// a raw keypair.
    pub fn seal_capsule(
        &self,
        capsule: &Capsule,
        sender: &str,
        session_key: &[u8],
        aad: &[u8],
    ) -> Result<SealedCapsule, IdentityError> {
        self.with_identity("seal_capsule", |kp| {
            SealedCapsule::seal(capsule, sender, session_key, aad, kp)
        })?
        .map_err(IdentityError::Seal)
    }

    /// A fresh ephemeral X25519 agreement session. Never persisted, never
    /// tied to the identity key — that separation is what buys forward
    /// secrecy.
    pub fn ephemeral_session(&self) -> AgreementSession {
        AgreementSession::new()
    }

    /// The shared peer registry handle.
    pub fn registry(&self) -> Arc<PeerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Register a peer's public key. Delegates to [`PeerRegistry::register`].
    pub fn register_peer(&self, peer_id: &str, public_key_pem: &str) -> Result<(), IdentityError> {
        Ok(self.registry.register(peer_id, public_key_pem)?)
    }

    /// Look up a peer's public key PEM. `None` means unknown peer.
    pub fn peer_public_key_pem(&self, peer_id: &str) -> Option<String> {
        self.registry.public_key_pem(peer_id)
    }

    fn with_identity<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&LumenKeypair) -> T,
    ) -> Result<T, IdentityError> {
        let guard = self.identity.read();
        match &*guard {
            Some(keypair) => Ok(f(keypair)),
            None => {
                error!(operation, "identity not established");
                Err(IdentityError::NotEstablished)
            }
        }
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}
