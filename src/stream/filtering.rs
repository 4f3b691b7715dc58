//! Id stream that drops ids a predicate rejects.

use std::sync::Arc;

use crate::stream::{IdStream, StreamError};

/// Smallest upstream page requested while topping up a short result.
const MIN_BATCH: usize = 3;

pub struct FilteringIdStream<F> {
    upstream: Arc<dyn IdStream>,
    keep: F,
}

impl<F> FilteringIdStream<F>
where
    F: Fn(u64) -> bool + Send + Sync,
{
    pub fn new(upstream: Arc<dyn IdStream>, keep: F) -> Self {
        Self { upstream, keep }
    }
}

impl<F> IdStream for FilteringIdStream<F>
where
    F: Fn(u64) -> bool + Send + Sync,
{
    fn ids(
        &self,
        offset: usize,
        limit: Option<usize>,
        since_id: Option<u64>,
        max_id: Option<u64>,
    ) -> Result<Vec<u64>, StreamError> {
        let Some(limit) = limit else {
            let all = self.upstream.ids(0, None, since_id, max_id)?;
            return Ok(all.into_iter().filter(|id| (self.keep)(*id)).skip(offset).collect());
        };

        let wanted = offset.saturating_add(limit);
        let mut kept = Vec::new();
        let mut start = 0;
        let mut ask = wanted.max(MIN_BATCH);

        // Page through upstream until enough ids survive the filter.
        loop {
            let batch = self.upstream.ids(start, Some(ask), since_id, max_id)?;
            let exhausted = batch.len() < ask;
            kept.extend(batch.into_iter().filter(|id| (self.keep)(*id)));

            if kept.len() >= wanted || exhausted {
                break;
            }
            start = start.saturating_add(ask);
            ask = (wanted - kept.len()).max(MIN_BATCH);
        }

        Ok(kept.into_iter().skip(offset).take(limit).collect())
    }
}
