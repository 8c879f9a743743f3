//! # Capsule Ingestion
//!
//! The envelope layer: plaintext [`Capsule`]s, their sealed wire form, and
//! the single-pass pipeline that decides whether an inbound envelope is
//! trusted.
//!
//! Outbound: [`SealedCapsule::seal`] — encrypt the content, sign the
//! ciphertext. Inbound: [`IngestPipeline::ingest`] — peer lookup, signature
//! check, decrypt, content gates, verdict. Nothing downstream of this module
//! ever touches a capsule that hasn't been through the pipeline.

pub mod capsule;
pub mod gates;
pub mod pipeline;

pub use capsule::{Capsule, SealedCapsule};
pub use gates::{
    NullDetector, NullSanitizer, SanitizeOutcome, SteganographyDetector, TextSanitizer,
};
pub use pipeline::{IngestPipeline, IngestReport, IngestVerdict};
