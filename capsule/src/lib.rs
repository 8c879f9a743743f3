// Copyright (c) 2026 Lumen Labs. MIT License.
// See LICENSE for details.

//! # Lumen Capsule — Security Core
//!
//! The cryptographic identity and secure-envelope pipeline underneath the
//! Lumen desktop assistant. Everything the assistant learns from a peer
//! arrives as a *capsule* — a unit of knowledge wrapped in an envelope that
//! is encrypted, authenticated, and signed — and everything in that envelope
//! passes through this crate before any other component may treat it as
//! content.
//!
//! The stack is deliberately boring: Ed25519 for identity and signatures,
//! X25519 + HKDF-SHA256 for forward-secret session keys, AES-256-GCM for the
//! content itself. The interesting part is the plumbing around it — key
//! lifecycle, peer registry, and the ingestion state machine that turns
//! "bytes plus a claimed sender" into a trust decision.
//!
//! ## Architecture
//!
//! - **crypto** — Low-level primitives. Don't roll your own.
//! - **identity** — The process keypair and the registry of peers we accept
//!   capsules from.
//! - **ingest** — The envelope format, the content-safety gate seams, and
//!   the verdict pipeline.
//! - **config** — Protocol constants and envelope parameters.
//!
//! The assistant's panels, tutor loop, and vector store sit on top of this
//! crate and consume exactly two things from it: verified plaintext capsules
//! and ingest verdicts.
//!
//! ## Design Philosophy
//!
//! 1. Fail closed. An error anywhere in verification means "not verified."
//! 2. Expected failures are values, not panics — every call site handles
//!    a bad envelope on the common path.
//! 3. No unsafe code anywhere near key material.
//! 4. Secrets are zeroized, never logged, and never returned as ambiguous
//!    empty defaults.

pub mod config;
pub mod crypto;
pub mod identity;
pub mod ingest;
