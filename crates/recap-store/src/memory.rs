//! In-memory blob store for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::BlobStore;

/// HashMap-backed blob store. Thread-safe via RwLock.
///
/// Mirrors the production client's observable behavior: unknown refs are
/// `NotFound`, and flipping [`MemoryBlobStore::set_offline`] makes every
/// call fail the way an unreachable daemon does.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
    offline: AtomicBool,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a blob under `blob_ref`, replacing any previous content.
    pub fn insert(&self, blob_ref: impl Into<String>, content: impl Into<Bytes>) {
        self.blobs
            .write()
            .expect("blob map lock poisoned")
            .insert(blob_ref.into(), content.into());
    }

    /// Simulates the daemon going away.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }
}

impl BlobStore for MemoryBlobStore {
    async fn get(&self, blob_ref: &str, _timeout: Duration) -> StoreResult<Bytes> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(StoreError::Transport {
                reason: "store offline".to_string(),
            });
        }
        let blobs = self.blobs.read().expect("blob map lock poisoned");
        blobs
            .get(blob_ref)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                blob_ref: blob_ref.to_string(),
            })
    }

    async fn is_alive(&self) -> bool {
        !self.offline.load(Ordering::Relaxed)
    }
}
