//! Error types for the index subsystem.

use thiserror::Error;

/// Result type alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Error variants for index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Wraps standard I/O errors from reading the index file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A capture line did not have the `key timestamp json` shape.
    #[error("Malformed index line {line_no}: {reason}")]
    MalformedLine {
        /// Physical line number in the index file (1-based).
        line_no: usize,
        /// Description of what failed to parse.
        reason: String,
    },

    /// The JSON metadata block of a capture line failed to parse.
    #[error("Malformed metadata block: {0}")]
    MalformedMeta(#[from] serde_json::Error),

    /// A record locator did not carry header and payload blob refs.
    #[error("Malformed locator: {locator}")]
    MalformedLocator {
        /// The locator string that could not be split.
        locator: String,
    },

    /// A query timestamp was not 1-14 ASCII digits.
    #[error("Invalid timestamp query: {value}")]
    InvalidTimestamp {
        /// The rejected timestamp value.
        value: String,
    },
}
