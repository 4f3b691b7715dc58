//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use social_router::config::AppConfig;
use social_router::store::{KeyValueStore, MemoryStore};
use social_router::stream::{IdStream, VecIdStream};
use social_router::{HttpServer, RouterCache};

/// A server running on an ephemeral port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub cache: RouterCache,
    pub store: MemoryStore,
    pub notices: Arc<VecIdStream>,
    pub updates: mpsc::UnboundedSender<AppConfig>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a server for `config` with `notice_ids` in the public timeline.
pub async fn spawn_server(config: AppConfig, notice_ids: &[u64]) -> TestServer {
    let store = MemoryStore::new();
    let cache = RouterCache::with_store(Arc::new(store.clone()));
    let notices = Arc::new(VecIdStream::new(notice_ids.iter().copied()));

    let shared_store: Arc<dyn KeyValueStore> = Arc::new(store.clone());
    let upstream: Arc<dyn IdStream> = notices.clone();
    let server = HttpServer::new(config, cache.clone(), shared_store, upstream).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (updates, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, Some(rx)).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    TestServer {
        addr,
        cache,
        store,
        notices,
        updates,
    }
}
