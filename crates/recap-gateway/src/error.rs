//! Error types for the gateway and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use recap_index::IndexError;
use recap_replay::ReplayError;

/// Error variants crossing the request boundary.
///
/// Negotiation outcomes (no captures, non-exact datetimes) are not
/// errors; they are response shapes built by the routes. Everything
/// here maps to an HTTP status and is rendered without crashing the
/// process.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Replay pipeline failure.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// Index read or parse failure outside the replay pipeline.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The request itself was malformed.
    #[error("Bad request: {reason}")]
    BadRequest {
        /// What was wrong with the request.
        reason: String,
    },
}

impl GatewayError {
    /// The HTTP status this error is reported as.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Replay(ReplayError::PayloadNotFound { .. }) => StatusCode::NOT_FOUND,
            GatewayError::Replay(ReplayError::StoreTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Replay(ReplayError::StoreTransport { .. }) => StatusCode::BAD_GATEWAY,
            GatewayError::Replay(ReplayError::Decryption { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::Replay(ReplayError::BadDatetime { .. }) => StatusCode::BAD_REQUEST,
            GatewayError::Replay(ReplayError::Index(IndexError::InvalidTimestamp { .. })) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Replay(ReplayError::Index(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Index(IndexError::InvalidTimestamp { .. }) => StatusCode::BAD_REQUEST,
            GatewayError::Index(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%self, "request failed");
        } else {
            tracing::debug!(%self, "request rejected");
        }
        let body = match &self {
            GatewayError::Replay(ReplayError::StoreTimeout { .. }) => {
                "Blob fetch timed out; the content store may still be retrieving it. \
                 Try again shortly."
                    .to_string()
            }
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_not_found_is_404() {
        let err = GatewayError::Replay(ReplayError::PayloadNotFound {
            blob_ref: "QmX".to_string(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_timeout_is_504_and_distinct_message() {
        let err = GatewayError::Replay(ReplayError::StoreTimeout {
            blob_ref: "QmX".to_string(),
        });
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_transport_is_502() {
        let err = GatewayError::Replay(ReplayError::StoreTransport {
            reason: "connection reset".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_decryption_is_500() {
        let err = GatewayError::Replay(ReplayError::Decryption {
            reason: "bad key".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bad_datetime_is_400() {
        let err = GatewayError::Replay(ReplayError::BadDatetime {
            value: "nope".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
