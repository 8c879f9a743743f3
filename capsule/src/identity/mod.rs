//! # Identity Module
//!
//! Long-term identity and peer-key management for the capsule pipeline.
//!
//! Two pieces live here, and they are deliberately separate objects rather
//! than a process-wide singleton:
//!
//! - [`KeyManager`] — owns the one Ed25519 identity keypair this process
//!   signs capsules with, including its on-disk lifecycle.
//! - [`PeerRegistry`] — the explicit map of peers we are willing to accept
//!   capsules from, shared by `Arc` with whoever needs lookups.
//!
//! Everything downstream (sealing, ingestion) borrows these; nothing else
//! in the crate holds key state.

pub mod manager;
pub mod registry;

pub use manager::{IdentityError, IdentityPaths, KeyManager};
pub use registry::{PeerRegistry, RegistryError};
