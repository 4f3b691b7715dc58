//! Windowed cache in front of an id stream.
//!
//! The newest `window` ids of a stream are kept under one store key. Pages
//! that fall inside the window are sliced from it. Everything else (pages
//! past the window, `since_id`/`max_id` queries, unbounded reads) goes
//! straight to the upstream stream.
//!
//! With `use_last`, a copy of the window is also kept under `<key>;last`.
//! Invalidation only drops the primary key, so the next read can refresh
//! from the last window by fetching ids newer than its head instead of
//! refetching the whole window.

use std::sync::Arc;

use crate::observability::metrics;
use crate::store::{KeyValueStore, StoreError};
use crate::stream::{IdStream, StreamError, CACHE_WINDOW};

pub struct CachingIdStream {
    upstream: Arc<dyn IdStream>,
    store: Arc<dyn KeyValueStore>,
    key: String,
    last_key: String,
    window: usize,
    use_last: bool,
}

impl CachingIdStream {
    pub fn new(
        upstream: Arc<dyn IdStream>,
        store: Arc<dyn KeyValueStore>,
        key: impl AsRef<str>,
    ) -> Self {
        let key = format!("stream:{}", key.as_ref());
        Self {
            upstream,
            store,
            last_key: format!("{};last", key),
            key,
            window: CACHE_WINDOW,
            use_last: true,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_use_last(mut self, use_last: bool) -> Self {
        self.use_last = use_last;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Drop the cached window. The `;last` copy stays for the next refresh.
    pub fn invalidate(&self) -> Result<bool, StreamError> {
        Ok(self.store.delete(&self.key)?)
    }

    fn read_window(&self, key: &str) -> Option<Vec<u64>> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache store read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(ids) => Some(ids),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unreadable id window");
                None
            }
        }
    }

    fn write_window(&self, ids: &[u64]) {
        let result = serde_json::to_string(ids)
            .map_err(|source| StoreError::Codec {
                key: self.key.clone(),
                source,
            })
            .and_then(|raw| {
                if self.use_last {
                    self.store.set(&self.last_key, raw.clone())?;
                }
                self.store.set(&self.key, raw)
            });

        if let Err(e) = result {
            tracing::warn!(key = %self.key, error = %e, "Cache store write failed");
        }
    }

    /// Rebuild the window, from the last copy when there is one.
    fn refresh(&self) -> Result<Vec<u64>, StreamError> {
        let last = if self.use_last {
            self.read_window(&self.last_key)
        } else {
            None
        };

        let window = match last {
            Some(mut last) if !last.is_empty() => {
                let newer = self.upstream.ids(0, Some(self.window), Some(last[0]), None)?;
                tracing::debug!(key = %self.key, new_ids = newer.len(), "Refreshing id window");
                metrics::record_stream_cache("refresh");
                let mut window = newer;
                window.append(&mut last);
                window.truncate(self.window);
                window
            }
            _ => {
                metrics::record_stream_cache("miss");
                self.upstream.ids(0, Some(self.window), None, None)?
            }
        };

        self.write_window(&window);
        Ok(window)
    }
}

fn slice(ids: &[u64], offset: usize, limit: usize) -> Vec<u64> {
    ids.iter().skip(offset).take(limit).copied().collect()
}

impl IdStream for CachingIdStream {
    fn ids(
        &self,
        offset: usize,
        limit: Option<usize>,
        since_id: Option<u64>,
        max_id: Option<u64>,
    ) -> Result<Vec<u64>, StreamError> {
        let in_window = |limit: usize| {
            since_id.is_none()
                && max_id.is_none()
                && offset.checked_add(limit).is_some_and(|end| end <= self.window)
        };
        let limit = match limit {
            Some(limit) if in_window(limit) => limit,
            _ => {
                metrics::record_stream_cache("bypass");
                return self.upstream.ids(offset, limit, since_id, max_id);
            }
        };

        if let Some(window) = self.read_window(&self.key) {
            metrics::record_stream_cache("hit");
            return Ok(slice(&window, offset, limit));
        }

        let window = self.refresh()?;
        Ok(slice(&window, offset, limit))
    }
}
