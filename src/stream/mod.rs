//! Notice id streams.
//!
//! # Data Flow
//! ```text
//! TimelineAction
//!     → CachingIdStream (window served from the key-value store)
//!     → FilteringIdStream (optional, drops ids a predicate rejects)
//!     → upstream IdStream (database query, or VecIdStream in memory)
//! ```
//!
//! Ids are ordered newest first.

pub mod caching;
pub mod filtering;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use thiserror::Error;

use crate::store::StoreError;

pub use caching::CachingIdStream;
pub use filtering::FilteringIdStream;

/// Largest number of ids a cached window holds.
pub const CACHE_WINDOW: usize = 200;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Stream source unavailable: {reason}")]
    Unavailable { reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An ordered source of notice ids.
pub trait IdStream: Send + Sync {
    /// Ids newest first, skipping `offset`.
    ///
    /// `limit: None` returns everything past `offset`. `since_id` keeps ids
    /// strictly newer than it; `max_id` keeps ids no newer than it.
    fn ids(
        &self,
        offset: usize,
        limit: Option<usize>,
        since_id: Option<u64>,
        max_id: Option<u64>,
    ) -> Result<Vec<u64>, StreamError>;
}

/// In-memory id stream.
#[derive(Debug, Default)]
pub struct VecIdStream {
    ids: RwLock<Vec<u64>>,
    fetches: AtomicUsize,
}

impl VecIdStream {
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        let mut ids: Vec<u64> = ids.into_iter().collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.dedup();
        Self {
            ids: RwLock::new(ids),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Add an id, keeping newest-first order.
    pub fn push(&self, id: u64) {
        let mut ids = self.ids.write().expect("id stream lock poisoned");
        if let Err(pos) = ids.binary_search_by(|existing| id.cmp(existing)) {
            ids.insert(pos, id);
        }
    }

    /// Number of `ids` calls served so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl IdStream for VecIdStream {
    fn ids(
        &self,
        offset: usize,
        limit: Option<usize>,
        since_id: Option<u64>,
        max_id: Option<u64>,
    ) -> Result<Vec<u64>, StreamError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let ids = self.ids.read().expect("id stream lock poisoned");
        let matching = ids
            .iter()
            .copied()
            .filter(|id| since_id.map_or(true, |since| *id > since))
            .filter(|id| max_id.map_or(true, |max| *id <= max))
            .skip(offset);
        Ok(match limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}
