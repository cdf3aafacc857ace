use audit_canonical::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing proof strings.
///
/// The verifier folds these into [`Verification::Failed`](crate::Verification::Failed);
/// they are public so callers parsing proofs directly can inspect them.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProofError {
    /// A proof item had no `:` between its label and hash.
    #[error("proof item '{0}' is missing the ':' separator")]
    MissingSeparator(String),
    /// A membership item label was not `l` or `r`.
    #[error("invalid proof side '{0}'")]
    InvalidSide(String),
    /// A consistency item did not start with an `x:` root chunk.
    #[error("invalid consistency root label '{0}'")]
    InvalidRootLabel(String),
    /// A proof hash did not decode.
    #[error("invalid proof hash: {0}")]
    InvalidHash(#[from] ValidationError),
    /// A consistency proof had no items.
    #[error("consistency proof is empty")]
    Empty,
}

/// Errors raised while loading or decoding key material.
#[derive(Error, Debug)]
pub enum KeyError {
    /// Key file could not be read.
    #[error("failed to read key file {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// PEM or DER structure was invalid or not an ed25519 key.
    #[error("invalid PEM key: {0}")]
    InvalidPem(String),
    /// Base64 payload did not decode.
    #[error("invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    /// Decoded material had the wrong length.
    #[error("{what} must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// What was being decoded.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// Key bytes were not a valid ed25519 point.
    #[error("invalid ed25519 key: {0}")]
    InvalidKey(String),
    /// The key envelope named an algorithm other than ed25519.
    #[error("unsupported key algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// The public key envelope was not valid JSON.
    #[error("invalid public key envelope: {0}")]
    InvalidEnvelope(String),
}
