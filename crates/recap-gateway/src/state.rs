//! Shared per-process state: one index handle, one store client, one
//! reconstructor. Built at server start and dependency-injected into
//! the routes; no process-wide singletons.

use std::sync::Arc;
use std::time::Duration;

use recap_index::IndexStore;
use recap_replay::{MementoResolver, Reconstructor};
use recap_store::BlobStore;

use crate::config::ReplayConfig;

/// Everything the route handlers need, shared read-only across
/// requests.
pub struct AppState<B: BlobStore> {
    /// Server configuration.
    pub config: ReplayConfig,
    /// Read handle on the capture index.
    pub index: IndexStore,
    /// Shared content-store client.
    pub store: Arc<B>,
    /// URI-R resolution.
    pub resolver: MementoResolver,
    /// Blob-to-response pipeline.
    pub reconstructor: Reconstructor<B>,
}

impl<B: BlobStore> AppState<B> {
    /// Wires up the state from a config and a store client.
    pub fn new(config: ReplayConfig, store: B) -> Self {
        let store = Arc::new(store);
        let reconstructor = Reconstructor::new(
            Arc::clone(&store),
            Duration::from_secs(config.fetch_timeout_secs),
        );
        Self {
            index: IndexStore::new(&config.index_path),
            resolver: MementoResolver::new(config.local_hosts()),
            store,
            reconstructor,
            config,
        }
    }
}
