//! HTTP front controller.
//!
//! # Responsibilities
//! - Map every request path through the site's route table
//! - Negotiate the route table variant from the Accept header
//! - Dispatch matched parameters to registered actions
//! - Swap in a rebuilt site when the configuration file changes
//!
//! # Design Decisions
//! - A single fallback handler: the route table, not axum, owns routing
//! - Requests hold a snapshot of the site; reloads never block them

use arc_swap::ArcSwap;
use axum::{
    extract::State,
    http::{header::ACCEPT, HeaderMap, Uri},
    response::{IntoResponse, Response},
    Router,
};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use url::form_urlencoded;

use crate::bootstrap::Site;
use crate::config::AppConfig;
use crate::dispatch::{ActionOutput, ActionRegistry, RouteInfoAction, TimelineAction};
use crate::error::{AppError, DeclarationError, RouteError};
use crate::observability::metrics;
use crate::routing::{Params, RouterCache};
use crate::store::KeyValueStore;
use crate::stream::{CachingIdStream, IdStream};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub site: Arc<ArcSwap<Site>>,
    pub cache: RouterCache,
    pub registry: Arc<ActionRegistry>,
}

/// HTTP server for a site.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Build the site routes and the action registry.
    ///
    /// `notices` is the upstream for the public timeline; `store` backs its
    /// cached window.
    pub fn new(
        config: AppConfig,
        cache: RouterCache,
        store: Arc<dyn KeyValueStore>,
        notices: Arc<dyn IdStream>,
    ) -> Result<Self, DeclarationError> {
        let timeline: Arc<dyn IdStream> = Arc::new(
            CachingIdStream::new(notices, store, "public")
                .with_window(config.stream.window)
                .with_use_last(config.stream.use_last),
        );

        let mut registry = ActionRegistry::new();
        registry.register("public", move || TimelineAction::new(timeline.clone()));
        registry.register_fallback(|| RouteInfoAction);

        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let site = Site::new(config, &cache)?;

        let state = AppState {
            site: Arc::new(ArcSwap::from_pointee(site)),
            cache,
            registry: Arc::new(registry),
        };
        let router = Self::build_router(request_timeout, state.clone());
        Ok(Self { router, state })
    }

    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: AppState) -> Router {
        Router::new()
            .fallback(front_controller)
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until Ctrl+C, applying configuration updates from `updates`.
    pub async fn run(
        self,
        listener: TcpListener,
        updates: Option<mpsc::UnboundedReceiver<AppConfig>>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(updates) = updates {
            tokio::spawn(apply_updates(self.state.clone(), updates));
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Rebuild the site for each new configuration.
///
/// A configuration that fails to build keeps the current site.
async fn apply_updates(state: AppState, mut updates: mpsc::UnboundedReceiver<AppConfig>) {
    while let Some(config) = updates.recv().await {
        state.cache.clear();
        match Site::new(config, &state.cache) {
            Ok(site) => {
                state.site.store(Arc::new(site));
                tracing::info!("Site routes rebuilt");
            }
            Err(e) => {
                tracing::error!(error = %e, "Rejected route configuration; keeping current routes");
            }
        }
    }
}

async fn front_controller(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let response = handle(&state, &uri, &headers).into_response();
    metrics::record_request(response.status().as_u16());
    response
}

fn handle(state: &AppState, uri: &Uri, headers: &HeaderMap) -> Result<ActionOutput, AppError> {
    let site = state.site.load();
    let accept = headers.get(ACCEPT).and_then(|v| v.to_str().ok());
    let router = site.router(&state.cache, site.negotiate(accept))?;

    let path = decode_path(request_path(uri.path()))?;
    let params = router.map(&path)?;
    let query = parse_query(uri.query());
    Ok(state.registry.dispatch(&router, &params, &query)?)
}

/// Route path for a request path: no leading slash and no `index.php` front controller segment.
pub fn request_path(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    match path.strip_prefix("index.php") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            rest.strip_prefix('/').unwrap_or(rest)
        }
        _ => path,
    }
}

/// Percent-decode a route path. Paths that are not UTF-8 match no route.
pub fn decode_path(path: &str) -> Result<String, RouteError> {
    percent_decode_str(path)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| RouteError::NoRoute {
            path: path.to_string(),
        })
}

fn parse_query(query: Option<&str>) -> Params {
    query
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C; serving until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::store::MemoryStore;
    use crate::stream::VecIdStream;

    fn server(config: AppConfig) -> HttpServer {
        HttpServer::new(
            config,
            RouterCache::new(),
            Arc::new(MemoryStore::new()),
            Arc::new(VecIdStream::default()),
        )
        .unwrap()
    }

    async fn get(server: &HttpServer, uri: &str, accept: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        let response = server
            .router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_front_controller() {
        let server = server(AppConfig::default());

        let (status, body) = get(&server, "/group", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "groups");

        let (status, body) = get(&server, "/no/such/page", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_single_user_root() {
        let mut config = AppConfig::default();
        config.site.single_user = true;
        config.site.single_user_nickname = "alice".into();
        let server = server(config);

        let (_, body) = get(&server, "/", Some("text/html")).await;
        assert_eq!(body["action"], "showstream");
        assert_eq!(body["params"]["nickname"], "alice");
        assert_eq!(body["link"], "");
    }

    #[tokio::test]
    async fn test_encoded_paths_are_decoded() {
        let server = server(AppConfig::default());

        let (status, body) = get(&server, "/tag/caf%C3%A9", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "tag");
        assert_eq!(body["params"]["tag"], "café");

        let (_, body) = get(&server, "/group/ac%6De", None).await;
        assert_eq!(body["action"], "showgroup");
        assert_eq!(body["params"]["nickname"], "acme");

        let (status, _) = get(&server, "/tag/%FF", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("tag/caf%C3%A9").unwrap(), "tag/café");
        assert_eq!(decode_path("notice/42").unwrap(), "notice/42");
        assert_eq!(
            decode_path("%FF"),
            Err(RouteError::NoRoute { path: "%FF".into() })
        );
    }

    #[test]
    fn test_request_path() {
        assert_eq!(request_path("/"), "");
        assert_eq!(request_path("/notice/42"), "notice/42");
        assert_eq!(request_path("/index.php"), "");
        assert_eq!(request_path("/index.php/group/acme"), "group/acme");
        assert_eq!(request_path("/index.phpx"), "index.phpx");
    }

    #[test]
    fn test_parse_query() {
        let query = parse_query(Some("page=2&q=a+b"));
        assert_eq!(query["page"], "2");
        assert_eq!(query["q"], "a b");
        assert!(parse_query(None).is_empty());
    }
}
