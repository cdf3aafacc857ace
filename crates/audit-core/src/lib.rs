//! Verification core for the secure audit log.
//!
//! This crate provides:
//! - The [`AuditEvent`] schema trait and the built-in [`StandardEvent`]
//! - Envelope reification and hash checks against the canonical encoding
//! - Membership and consistency proof parsing and verification
//! - ed25519 signing for outgoing events and verification of returned envelopes
//! - Three-valued [`Verification`] verdicts
//!
//! Core invariants:
//! - A record's hash is `SHA-256(canonical(envelope))`
//! - Hash pairing is always `SHA-256(left || right)` with the side taken from the proof
//! - Proof and signature problems become [`Verification::Failed`], never errors
//!
#![deny(missing_docs)]

/// Error types for core operations.
pub mod errors;
/// Event schemas and envelopes.
pub mod events;
/// Merkle membership and consistency verification.
pub mod merkle;
/// Proof string parsing.
pub mod proof;
/// ed25519 signing and signature verification.
pub mod signature;
/// In-memory Merkle tree used to produce proofs in tests.
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
/// Verification verdicts.
pub mod verification;

pub use errors::{KeyError, ProofError};
pub use events::{envelope_hash, verify_envelope_hash, AuditEvent, EventEnvelope, StandardEvent};
pub use merkle::{
    verify_consistency, verify_consistency_proof, verify_membership, verify_membership_proof,
};
pub use proof::{ConsistencyItem, ConsistencyProof, MembershipProof, ProofItem, Side};
pub use signature::{
    public_key_envelope, verify_signature, Ed25519Signer, PublicKeyEnvelope, Signer, ED25519,
};
pub use verification::Verification;
