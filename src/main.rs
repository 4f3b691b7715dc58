//! social-router server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http front controller
//!                         │  Accept header → table variant
//!                         ▼
//!                     RouterCache ──miss──▶ bootstrap (core routes + plugins)
//!                         │                     │
//!                         │◀── RouteTable ──────┘   (snapshot in KeyValueStore)
//!                         ▼
//!                     Router::map(path) → { action, params }
//!                         ▼
//!                     ActionRegistry::dispatch → JSON response
//!
//!     config.toml ──notify──▶ reload: clear RouterCache, rebuild Site
//! ```
//!
//! The config path comes from the first argument or `SOCIAL_ROUTER_CONFIG`;
//! without either, defaults are used.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;

use social_router::config::{load_or_default, watcher::ConfigWatcher};
use social_router::observability::{logging, metrics};
use social_router::store::{KeyValueStore, MemoryStore};
use social_router::stream::{IdStream, VecIdStream};
use social_router::{HttpServer, RouterCache};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SOCIAL_ROUTER_CONFIG").ok())
        .map(PathBuf::from);

    let config = load_or_default(config_path.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(version = %config.site.version, "social-router starting");
    tracing::info!(
        site = %config.site.name,
        bind_address = %config.listener.bind_address,
        single_user = config.site.single_user,
        plugins = ?config.plugins.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let cache = RouterCache::with_store(store.clone());
    let notices: Arc<dyn IdStream> = Arc::new(VecIdStream::default());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Keep the watcher handle alive for the lifetime of the server.
    let (updates, _watcher) = match &config_path {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(rx), Some(watcher.run()?))
        }
        None => (None, None),
    };

    let server = HttpServer::new(config, cache, store, notices)?;
    server.run(listener, updates).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
