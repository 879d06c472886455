//! Concurrent fan-out over a list of ids with a join-all barrier.
//!
//! All fetches are started together and awaited together. The batch only
//! succeeds when every member succeeds; otherwise the failure of the first id
//! (in input order) that failed is returned and any successful results are
//! dropped.

use std::future::Future;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::errors::{DealerApiError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct FanOut {
    max_in_flight: Option<usize>,
}

impl FanOut {
    /// Every fetch in flight at once.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// At most `limit` fetches in flight at once. A limit of zero is treated as one.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            max_in_flight: Some(limit.max(1)),
        }
    }

    pub fn from_max_in_flight(max_in_flight: Option<usize>) -> Self {
        max_in_flight.map_or_else(Self::unbounded, Self::with_limit)
    }

    pub fn max_in_flight(&self) -> Option<usize> {
        self.max_in_flight
    }

    /// Run `fetch` for every id and collect the results in input order.
    pub async fn fetch_all<T, F, Fut>(&self, ids: &[i32], fetch: F) -> Result<Vec<T>>
    where
        F: Fn(i32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Fanning out {} fetches (max in flight: {:?})",
            ids.len(),
            self.max_in_flight
        );

        let results: Vec<Result<T>> = match self.max_in_flight {
            Some(limit) => {
                stream::iter(ids.iter().map(|&id| fetch(id)))
                    .buffered(limit)
                    .collect()
                    .await
            }
            None => join_all(ids.iter().map(|&id| fetch(id))).await,
        };

        let mut values = Vec::with_capacity(results.len());
        for (&id, result) in ids.iter().zip(results) {
            match result {
                Ok(value) => values.push(value),
                Err(e) => return Err(DealerApiError::aggregate(id, e)),
            }
        }
        Ok(values)
    }
}
