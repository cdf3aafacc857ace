use audit_canonical::CanonicalizationError;
use audit_core::KeyError;
use thiserror::Error;

use crate::response::FieldError;

/// Failures of the underlying transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or no response arrived.
    #[error("request to {url} failed: {message}")]
    Request {
        /// Target URL.
        url: String,
        /// Underlying error.
        message: String,
    },
    /// The response body was not JSON.
    #[error("invalid response body from {url}: {message}")]
    Body {
        /// Target URL.
        url: String,
        /// Underlying error.
        message: String,
    },
}

/// Errors returned by client operations.
///
/// Proof and signature problems are not errors: they are reported as verdicts
/// on the result. Only a hash mismatch is promoted to an error.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Network or HTTP failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The service accepted the request but the result is not ready yet.
    #[error("request {request_id} accepted; result not yet available")]
    AcceptedPending {
        /// Identifier to poll with.
        request_id: String,
    },
    /// The service answered with JSON that does not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    /// A returned hash does not match the canonical envelope.
    #[error("hash mismatch: computed {computed}, server returned {returned}")]
    HashMismatch {
        /// Hash computed locally.
        computed: String,
        /// Hash the service returned.
        returned: String,
    },
    /// Invalid client or session configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// Signer key material could not be used.
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    /// The service returned a non-success status.
    #[error("service error {status} (request {request_id}): {summary}")]
    Service {
        /// Request identifier.
        request_id: String,
        /// Status string, e.g. `ValidationError`.
        status: String,
        /// Human-readable summary.
        summary: String,
        /// Structured field errors.
        errors: Vec<FieldError>,
    },
    /// An event could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}
