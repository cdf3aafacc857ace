use thiserror::Error;

/// Validation errors for canonical primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Input was not valid hexadecimal.
    #[error("{field} ('{value}') is not valid hex")]
    InvalidHex {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// Decoded bytes had the wrong length.
    #[error("{field} has {actual} bytes, expected {expected}")]
    InvalidLength {
        /// Field name that failed validation.
        field: &'static str,
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },
    /// Timestamp did not match an accepted layout.
    #[error("timestamp ('{0}') is not in an accepted format")]
    InvalidTimestamp(String),
}
