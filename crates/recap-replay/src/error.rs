//! Error types for the replay subsystem.

use thiserror::Error;

use recap_index::IndexError;
use recap_store::StoreError;

/// Result type alias for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Error variants for resolution, TimeMap generation, and reconstruction.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Index read or parse failure.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The capture's payload blob is not in the content store.
    #[error("Payload blob not found: {blob_ref}")]
    PayloadNotFound {
        /// The missing blob ref.
        blob_ref: String,
    },

    /// A blob fetch exceeded its bound. Retryable.
    #[error("Blob fetch timed out: {blob_ref}")]
    StoreTimeout {
        /// The blob ref being fetched.
        blob_ref: String,
    },

    /// The content store is reachable but failing.
    #[error("Content store error: {reason}")]
    StoreTransport {
        /// Description of the failure.
        reason: String,
    },

    /// The capture could not be decrypted. Fatal for this request:
    /// unverified bytes are never emitted.
    #[error("Decryption failed: {reason}")]
    Decryption {
        /// Description of the failure.
        reason: String,
    },

    /// A datetime was not a valid 14-digit stamp or RFC 1123 string.
    #[error("Invalid datetime: {value}")]
    BadDatetime {
        /// The rejected datetime value.
        value: String,
    },
}

impl ReplayError {
    /// Maps a store failure on `blob_ref` into the replay taxonomy.
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { blob_ref } => ReplayError::PayloadNotFound { blob_ref },
            StoreError::Timeout { blob_ref, .. } => ReplayError::StoreTimeout { blob_ref },
            StoreError::Transport { reason } => ReplayError::StoreTransport { reason },
        }
    }
}
