#![warn(missing_docs)]

//! RECAP content-store subsystem: get-by-ref access to archived blobs.
//!
//! Captures live in a content-addressed store reached over a daemon HTTP
//! API. This crate exposes the [`BlobStore`] seam the replay pipeline is
//! generic over, the production [`HttpBlobStore`] client, and an
//! in-memory store for tests.

pub mod error;
pub mod http;
pub mod memory;

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;

pub use error::{StoreError, StoreResult};
pub use http::HttpBlobStore;
pub use memory::MemoryBlobStore;

/// Get-by-ref access to a content-addressed blob store.
///
/// One long-lived instance is shared across requests; `get` must be safe
/// to call concurrently. Fetches are the only operations expected to
/// block for non-trivial time, so every `get` is bounded by `timeout`
/// and failures come back as values, never panics.
pub trait BlobStore: Send + Sync {
    /// Fetches the blob identified by `blob_ref`.
    fn get(
        &self,
        blob_ref: &str,
        timeout: Duration,
    ) -> impl Future<Output = StoreResult<Bytes>> + Send;

    /// Returns whether the backing store is reachable at all. Used to
    /// fail fast with a service-unavailable page instead of timing out
    /// per blob.
    fn is_alive(&self) -> impl Future<Output = bool> + Send;
}
