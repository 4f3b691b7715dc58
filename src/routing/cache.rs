//! Process-wide cache of built route tables.
//!
//! Route sets depend on the site mode, the code version and the enabled
//! plugins, so tables are cached under a fingerprint of those. A changed
//! configuration produces a new fingerprint; stale entries are simply never
//! asked for again. `clear` drops everything held in-process.
//!
//! With an external [`KeyValueStore`] attached, a local miss first looks for
//! a declaration snapshot in the store and replays it, which skips plugin
//! bootstrap code entirely.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::DeclarationError;
use crate::observability::metrics;
use crate::routing::route::Declaration;
use crate::routing::table::RouteTable;
use crate::store::{KeyValueStore, StoreError};

/// Namespace for content-addressed router cache keys.
const FINGERPRINT_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_93c2_4d1e_5b07_8c3a_2e9f_b410_d75e);

/// Identity of a route set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    key: String,
}

impl Fingerprint {
    /// Fingerprint for a site mode, version and plugin set.
    ///
    /// Plugin order does not matter.
    pub fn new<S: AsRef<str>>(single_user: bool, version: &str, plugins: &[S]) -> Self {
        let mut names: Vec<&str> = plugins.iter().map(|p| p.as_ref()).collect();
        names.sort_unstable();
        names.dedup();

        let mode = if single_user { "1user" } else { "multi" };
        let raw = format!("router:{}:{}:{}", mode, version, names.join(","));
        let digest = Uuid::new_v5(&FINGERPRINT_NAMESPACE, raw.as_bytes());

        Self {
            key: format!("router:{}", digest.simple()),
        }
    }

    /// Distinguish tables built for a negotiated media type.
    pub fn with_variant(self, variant: Option<&str>) -> Self {
        match variant {
            Some(variant) => Self {
                key: format!("{};{}", self.key, variant.to_ascii_lowercase()),
            },
            None => self,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Shared cache of route tables keyed by fingerprint.
#[derive(Clone, Default)]
pub struct RouterCache {
    tables: Arc<DashMap<String, Arc<RouteTable>>>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl RouterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back the in-process cache with an external store.
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            tables: Arc::new(DashMap::new()),
            store: Some(store),
        }
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<RouteTable>> {
        self.tables.get(fingerprint.key()).map(|r| r.value().clone())
    }

    pub fn insert(&self, fingerprint: &Fingerprint, table: RouteTable) -> Arc<RouteTable> {
        let table = Arc::new(table);
        self.tables
            .insert(fingerprint.key().to_string(), table.clone());
        table
    }

    /// Return the cached table, or load/build and cache it.
    ///
    /// `accept` is the negotiated Accept value the table is built for; it is
    /// applied when replaying a stored snapshot.
    pub fn get_or_build<F>(
        &self,
        fingerprint: &Fingerprint,
        accept: Option<&str>,
        build: F,
    ) -> Result<Arc<RouteTable>, DeclarationError>
    where
        F: FnOnce() -> Result<RouteTable, DeclarationError>,
    {
        if let Some(table) = self.get(fingerprint) {
            metrics::record_router_cache("hit");
            return Ok(table);
        }

        let table = match self.load_snapshot(fingerprint, accept)? {
            Some(table) => {
                metrics::record_router_cache("store");
                table
            }
            None => {
                metrics::record_router_cache("build");
                let table = build()?;
                tracing::info!(
                    fingerprint = %fingerprint,
                    routes = table.declarations().len(),
                    "Route table built"
                );
                self.save_snapshot(fingerprint, &table);
                table
            }
        };

        // Another caller may have won the race; keep the first table.
        let entry = self
            .tables
            .entry(fingerprint.key().to_string())
            .or_insert_with(|| Arc::new(table));
        Ok(entry.value().clone())
    }

    /// Drop every in-process table.
    pub fn clear(&self) {
        let dropped = self.tables.len();
        self.tables.clear();
        tracing::info!(dropped, "Router cache cleared");
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn load_snapshot(
        &self,
        fingerprint: &Fingerprint,
        accept: Option<&str>,
    ) -> Result<Option<RouteTable>, DeclarationError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let raw = match store.get(fingerprint.key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(fingerprint = %fingerprint, error = %e, "Cache store read failed");
                return Ok(None);
            }
        };

        match serde_json::from_str::<Vec<Declaration>>(&raw) {
            Ok(declarations) => RouteTable::replay(declarations, accept).map(Some),
            Err(e) => {
                tracing::warn!(fingerprint = %fingerprint, error = %e, "Discarding unreadable route snapshot");
                Ok(None)
            }
        }
    }

    fn save_snapshot(&self, fingerprint: &Fingerprint, table: &RouteTable) {
        let Some(store) = &self.store else {
            return;
        };

        let result = serde_json::to_string(table.declarations())
            .map_err(|source| StoreError::Codec {
                key: fingerprint.key().to_string(),
                source,
            })
            .and_then(|raw| store.set(fingerprint.key(), raw));

        if let Err(e) = result {
            tracing::warn!(fingerprint = %fingerprint, error = %e, "Cache store write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::{params, Patterns};
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn build_table() -> Result<RouteTable, DeclarationError> {
        let mut table = RouteTable::new();
        table.connect("group", params([("action", "groups")]), Patterns::new())?;
        table.connect(
            "notice/:notice",
            params([("action", "shownotice")]),
            params([("notice", "[0-9]+")]),
        )?;
        Ok(table)
    }

    #[test]
    fn test_fingerprint_depends_on_configuration() {
        let base = Fingerprint::new(false, "2.0.0", &["Directory", "Sitemap"]);
        let reordered = Fingerprint::new(false, "2.0.0", &["Sitemap", "Directory"]);
        assert_eq!(base, reordered);
        assert!(base.key().starts_with("router:"));

        assert_ne!(base, Fingerprint::new(true, "2.0.0", &["Directory", "Sitemap"]));
        assert_ne!(base, Fingerprint::new(false, "2.0.1", &["Directory", "Sitemap"]));
        assert_ne!(base, Fingerprint::new(false, "2.0.0", &["Directory"]));
        assert_ne!(base, base.clone().with_variant(Some("application/json")));
        assert_eq!(base, base.clone().with_variant(None));
    }

    #[test]
    fn test_builds_once_per_fingerprint() {
        let cache = RouterCache::new();
        let fp = Fingerprint::new(false, "1", &[] as &[&str]);
        let builds = AtomicUsize::new(0);

        for _ in 0..3 {
            let table = cache
                .get_or_build(&fp, None, || {
                    builds.fetch_add(1, Ordering::SeqCst);
                    build_table()
                })
                .unwrap();
            assert_eq!(table.match_path("group").unwrap()["action"], "groups");
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_forces_rebuild() {
        let cache = RouterCache::new();
        let fp = Fingerprint::new(false, "1", &[] as &[&str]);
        cache.get_or_build(&fp, None, build_table).unwrap();

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&fp).is_none());

        let builds = AtomicUsize::new(0);
        cache
            .get_or_build(&fp, None, || {
                builds.fetch_add(1, Ordering::SeqCst);
                build_table()
            })
            .unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_errors_are_not_cached() {
        let cache = RouterCache::new();
        let fp = Fingerprint::new(false, "1", &[] as &[&str]);
        let result = cache.get_or_build(&fp, None, || {
            let mut table = RouteTable::new();
            table.connect("broken", Default::default(), Patterns::new())?;
            Ok(table)
        });
        assert!(matches!(result, Err(DeclarationError::MissingAction { .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_snapshot_replayed_from_store() {
        let store = Arc::new(MemoryStore::new());
        let fp = Fingerprint::new(false, "1", &["Directory"]);

        let first = RouterCache::with_store(store.clone());
        first.get_or_build(&fp, None, build_table).unwrap();
        assert!(store.get(fp.key()).unwrap().is_some());

        // A fresh process sharing the store never runs the builder.
        let second = RouterCache::with_store(store);
        let table = second
            .get_or_build(&fp, None, || panic!("table should come from the store"))
            .unwrap();
        assert_eq!(
            table.match_path("notice/12").unwrap(),
            params([("action", "shownotice"), ("notice", "12")])
        );
    }

    #[test]
    fn test_unreadable_snapshot_is_rebuilt() {
        let store = Arc::new(MemoryStore::new());
        let fp = Fingerprint::new(false, "1", &[] as &[&str]);
        store.set(fp.key(), "not json".into()).unwrap();

        let cache = RouterCache::with_store(store.clone());
        let table = cache.get_or_build(&fp, None, build_table).unwrap();
        assert_eq!(table.paths().len(), 2);

        let raw = store.get(fp.key()).unwrap().unwrap();
        let declarations: Vec<Declaration> = serde_json::from_str(&raw).unwrap();
        assert_eq!(declarations.len(), 2);
    }
}
