//! Canonical primitives shared by every audit verification step.
//!
//! The service hashes and signs events over one byte representation: object
//! keys sorted by wire name, absent values dropped, no insignificant
//! whitespace, and timestamps rendered as `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
//! Everything that feeds a hash comparison or a signature lives in this crate.
//!
#![deny(missing_docs)]

/// Canonical JSON encoding used for hashing and signing.
pub mod canonicalizer;
/// SHA-256 hash newtype and ordered pairing.
pub mod digest;
/// Timestamps in the audit wire format.
pub mod timestamp;
/// Validation errors for canonical primitives.
pub mod validation;

pub use canonicalizer::{canonicalize, canonicalize_value, hash_canonical, CanonicalizationError};
pub use digest::{Hash, HashPair, HASH_LEN};
pub use timestamp::Timestamp;
pub use validation::ValidationError;
