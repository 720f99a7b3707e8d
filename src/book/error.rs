//! Error types of the book's serialization surface.
//!
//! Matching-time validation failures are not errors: they surface as
//! reject events on the callback stream. Internal invariant violations are
//! fatal and panic. What remains fallible is the snapshot path.

use thiserror::Error;

/// Errors from serializing, packaging, or validating depth snapshots.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BookError {
    /// Snapshot could not be serialized.
    #[error("serialization error: {message}")]
    Serialization {
        /// Underlying error message
        message: String,
    },

    /// Snapshot integrity check failed.
    #[error("checksum mismatch: expected {expected}, but computed {actual}")]
    ChecksumMismatch {
        /// Expected checksum value
        expected: String,
        /// Actual checksum value
        actual: String,
    },
}
