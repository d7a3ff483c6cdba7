//! Bounded-concurrency fan-out over station pairs.
//!
//! Drives `RouteCache::get` for a batch of pairs with at most
//! `max_concurrent` lookups in flight. One failing pair never stops the
//! rest; failures are collected in the report. Pairs complete in no
//! particular order.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{RouteCache, SaveOutcome};
use crate::domain::{RouteError, RouteKey, Station};
use crate::fares::RouteSource;

/// Default maximum concurrent lookups per batch.
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// A pair that could not be fetched.
#[derive(Debug, Clone)]
pub struct PairFailure {
    pub key: RouteKey,
    pub error: RouteError,
}

/// Outcome of one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Pairs in the batch.
    pub requested: usize,

    /// Pairs now cached (fetched or already present).
    pub succeeded: usize,

    /// Pairs whose lookup failed.
    pub failed: Vec<PairFailure>,

    /// Pairs not completed before the deadline.
    pub aborted: usize,
}

impl BatchReport {
    /// Whether every pair succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.aborted == 0
    }
}

/// Runs batches of route lookups under a concurrency cap.
#[derive(Debug, Clone)]
pub struct FetchOrchestrator {
    max_concurrent: usize,
    deadline: Option<Duration>,
}

impl Default for FetchOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}

impl FetchOrchestrator {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            deadline: None,
        }
    }

    /// Abort work still outstanding after `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Look up every pair, returning once each has succeeded or failed, or
    /// the deadline has passed.
    ///
    /// Lookups cut off by the deadline insert nothing; the cache only ever
    /// stores fully extracted routes.
    pub async fn run<S: RouteSource>(
        &self,
        cache: &RouteCache<S>,
        pairs: Vec<(Station, Station)>,
    ) -> BatchReport {
        let mut report = BatchReport {
            requested: pairs.len(),
            ..BatchReport::default()
        };
        if pairs.is_empty() {
            return report;
        }

        let deadline = self.deadline.map(|d| Instant::now() + d);

        let mut lookups = stream::iter(pairs)
            .map(|(from, to)| async move {
                let result = cache.get(&from, &to).await;
                (RouteKey::new(&from, &to), result)
            })
            .buffer_unordered(self.max_concurrent);

        let mut completed = 0;
        loop {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, lookups.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        report.aborted = report.requested - completed;
                        warn!(aborted = report.aborted, "Batch deadline reached");
                        break;
                    }
                },
                None => lookups.next().await,
            };

            let Some((key, result)) = next else {
                break;
            };
            completed += 1;

            match result {
                Ok(_) => {
                    report.succeeded += 1;
                    match cache.autosave().await {
                        Ok(SaveOutcome::Written { routes }) => {
                            debug!(routes, "Autosaved during batch");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Autosave failed"),
                    }
                }
                Err(error) => {
                    debug!(key = %key, error = %error, "Pair failed");
                    report.failed.push(PairFailure { key, error });
                }
            }
        }

        info!(
            requested = report.requested,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            aborted = report.aborted,
            "Batch complete"
        );

        report
    }
}
