#![warn(missing_docs)]

//! RECAP replay server: Memento access to captures in a
//! content-addressed store.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use recap_gateway::{router, AppState, ReplayConfig};
use recap_store::{BlobStore, HttpBlobStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = ReplayConfig::from_env();
    tracing::info!(
        index = %config.index_path,
        store = %config.store_api,
        "RECAP replay starting..."
    );

    let store = HttpBlobStore::new(config.store_api.clone());
    if !store.is_alive().await {
        tracing::warn!(
            store = %config.store_api,
            "content store daemon is not reachable; replay will answer 503 until it is"
        );
    }

    let bind = config.bind.to_socket_addr_string();
    let public = config.public_host();
    let state = Arc::new(AppState::new(config, store));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("RECAP replay listening on http://{public}");
    axum::serve(listener, app).await?;

    Ok(())
}
