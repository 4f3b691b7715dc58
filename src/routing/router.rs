//! Route lookup and link building.
//!
//! # Responsibilities
//! - Wrap a shared, immutable route table
//! - Map request paths to action parameters
//! - Build local links for an action
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Explicit NoRoute rather than silent default
//! - Absolute links are joined onto the configured site base URL

use std::sync::Arc;
use url::Url;

use crate::error::RouteError;
use crate::routing::route::{Params, ACTION};
use crate::routing::table::RouteTable;

/// Read-only handle on a route table.
#[derive(Debug, Clone)]
pub struct Router {
    table: Arc<RouteTable>,
}

impl Router {
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Map a request path (no leading slash, no query) to action parameters.
    pub fn map(&self, path: &str) -> Result<Params, RouteError> {
        match self.table.match_path(path) {
            Ok(params) => {
                tracing::debug!(path = %path, action = ?params.get(ACTION), "Route matched");
                Ok(params)
            }
            Err(e) => {
                tracing::debug!(path = %path, "No route matched");
                Err(e)
            }
        }
    }

    /// Build the path for `action`, merging `action` into `args`.
    pub fn build(
        &self,
        action: &str,
        args: Option<&Params>,
        query: Option<&Params>,
        fragment: Option<&str>,
    ) -> Result<String, RouteError> {
        let mut merged = args.cloned().unwrap_or_default();
        merged.insert(ACTION.to_string(), action.to_string());
        self.table.generate(&merged, query, fragment)
    }
}

/// Builds absolute links for a site.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: Url,
    fancy: bool,
}

impl LinkBuilder {
    /// `fancy` links omit the `index.php/` front controller segment.
    pub fn new(mut base: Url, fancy: bool) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base, fancy }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Absolute URL for an action.
    pub fn local_url(
        &self,
        router: &Router,
        action: &str,
        args: Option<&Params>,
        query: Option<&Params>,
        fragment: Option<&str>,
    ) -> Result<String, RouteError> {
        let path = router.build(action, args, query, fragment)?;
        let relative = if self.fancy {
            path
        } else {
            format!("index.php/{}", path)
        };

        self.base
            .join(&relative)
            .map(String::from)
            .map_err(|e| RouteError::InvalidUrl {
                path: relative,
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::{params, Patterns};

    fn router() -> Router {
        let mut table = RouteTable::new();
        table
            .connect("", params([("action", "public")]), Patterns::new())
            .unwrap();
        table
            .connect(
                "notice/:notice",
                params([("action", "shownotice")]),
                params([("notice", "[0-9]+")]),
            )
            .unwrap();
        Router::new(Arc::new(table))
    }

    #[test]
    fn test_map() {
        let router = router();
        assert_eq!(router.map("").unwrap()["action"], "public");
        assert_eq!(router.map("notice/9").unwrap()["notice"], "9");
        assert!(matches!(router.map("notice/x"), Err(RouteError::NoRoute { .. })));
    }

    #[test]
    fn test_build_merges_action() {
        let router = router();
        let path = router
            .build("shownotice", Some(&params([("notice", "9")])), None, Some("reply"))
            .unwrap();
        assert_eq!(path, "notice/9#reply");

        // An `action` inside args is overridden by the explicit one.
        let path = router
            .build("public", Some(&params([("action", "shownotice")])), None, None)
            .unwrap();
        assert_eq!(path, "");
    }

    #[test]
    fn test_local_url() {
        let router = router();
        let base = Url::parse("https://social.example/gnusocial").unwrap();

        let fancy = LinkBuilder::new(base.clone(), true);
        assert_eq!(
            fancy
                .local_url(&router, "shownotice", Some(&params([("notice", "5")])), None, None)
                .unwrap(),
            "https://social.example/gnusocial/notice/5"
        );
        assert_eq!(
            fancy.local_url(&router, "public", None, None, None).unwrap(),
            "https://social.example/gnusocial/"
        );

        let plain = LinkBuilder::new(base, false);
        assert_eq!(
            plain
                .local_url(
                    &router,
                    "shownotice",
                    Some(&params([("notice", "5")])),
                    Some(&params([("page", "2")])),
                    None
                )
                .unwrap(),
            "https://social.example/gnusocial/index.php/notice/5?page=2"
        );
    }
}
