//! HTTP client for a content-addressed store daemon.
//!
//! The daemon speaks an IPFS-style API: `POST /api/v0/cat?arg={ref}`
//! streams a blob's bytes, `POST /api/v0/version` answers when the
//! daemon is up. One client (and its connection pool) is built at server
//! start and shared across requests.

use std::time::Duration;

use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::BlobStore;

/// Client for the store daemon's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    api_base: String,
}

impl HttpBlobStore {
    /// Creates a client for the daemon at `api_base`,
    /// e.g. `http://localhost:5001`.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// The daemon API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn cat(&self, blob_ref: &str, timeout: Duration) -> StoreResult<Bytes> {
        let url = format!("{}/api/v0/cat?arg={blob_ref}", self.api_base);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, blob_ref, timeout))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                blob_ref: blob_ref.to_string(),
            });
        }
        if !status.is_success() {
            // The daemon reports unknown refs as a 500 with a message
            // body rather than a 404.
            let body = response.text().await.unwrap_or_default();
            if body.contains("not found") || body.contains("no link named") {
                return Err(StoreError::NotFound {
                    blob_ref: blob_ref.to_string(),
                });
            }
            return Err(StoreError::Transport {
                reason: format!("daemon returned {status}: {body}"),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| classify(e, blob_ref, timeout))
    }
}

fn classify(err: reqwest::Error, blob_ref: &str, timeout: Duration) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout {
            blob_ref: blob_ref.to_string(),
            timeout,
        }
    } else {
        StoreError::Transport {
            reason: err.to_string(),
        }
    }
}

impl BlobStore for HttpBlobStore {
    async fn get(&self, blob_ref: &str, timeout: Duration) -> StoreResult<Bytes> {
        // Belt and suspenders: the client timeout covers the HTTP
        // exchange, the outer bound covers everything else.
        match tokio::time::timeout(timeout, self.cat(blob_ref, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                blob_ref: blob_ref.to_string(),
                timeout,
            }),
        }
    }

    async fn is_alive(&self) -> bool {
        let url = format!("{}/api/v0/version", self.api_base);
        match self
            .client
            .post(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(%err, "store daemon liveness probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let store = HttpBlobStore::new("http://localhost:5001/");
        assert_eq!(store.api_base(), "http://localhost:5001");
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_not_alive() {
        // Reserved TEST-NET-1 address, nothing listens there.
        let store = HttpBlobStore::new("http://192.0.2.1:1");
        assert!(!store.is_alive().await);
    }

    #[tokio::test]
    async fn test_unreachable_daemon_get_is_timeout_or_transport() {
        let store = HttpBlobStore::new("http://192.0.2.1:1");
        let err = store
            .get("QmAbc", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Timeout { .. } | StoreError::Transport { .. }
        ));
    }
}
