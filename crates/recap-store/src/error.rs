//! Error types for the content-store subsystem.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error variants for blob fetches.
///
/// The three variants are deliberately distinct user-facing outcomes:
/// a missing blob is a 404, a timeout is retryable, and a transport
/// failure means the store is reachable but misbehaving.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store does not hold a blob with this ref.
    #[error("Blob not found: {blob_ref}")]
    NotFound {
        /// The blob ref that was not found.
        blob_ref: String,
    },

    /// The fetch did not complete within its bound.
    #[error("Blob fetch timed out after {timeout:?}: {blob_ref}")]
    Timeout {
        /// The blob ref being fetched.
        blob_ref: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The store answered, but with a failure that is neither a miss
    /// nor a timeout.
    #[error("Store transport error: {reason}")]
    Transport {
        /// Description of the failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::NotFound {
            blob_ref: "QmAbc".to_string(),
        };
        assert_eq!(err.to_string(), "Blob not found: QmAbc");
    }

    #[test]
    fn test_timeout_display_mentions_bound() {
        let err = StoreError::Timeout {
            blob_ref: "QmAbc".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert!(err.to_string().contains("10s"));
    }
}
