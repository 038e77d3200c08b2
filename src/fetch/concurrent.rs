//! Concurrent batch fetcher with bounded fan-out and ordered results.
//!
//! This module provides the `ConcurrentFetcher` which fetches an ordered list
//! of URLs using one tokio task per URL, gated by a semaphore, with automatic
//! retry on transient failures using linear backoff.
//!
//! # Overview
//!
//! Units of work complete in any order. Their outcomes are placed back at the
//! position of the request that produced them, so `results[i]` always belongs
//! to `requests[i]`.
//!
//! # Example
//!
//! ```no_run
//! use filmfetch_core::fetch::ConcurrentFetcher;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = ConcurrentFetcher::with_concurrency(10)?;
//! let urls = ["http://oscars.yipitdata.com/films/1", "http://oscars.yipitdata.com/films/2"];
//! let results = fetcher.fetch_urls(&urls).await;
//! assert_eq!(results.len(), 2);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use super::attempt::{AttemptContext, BatchPosition, run_attempts};
use super::client::{ClientSettings, HttpClient};
use super::constants::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::error::BatchError;
use super::outcome::{FetchOutcome, FetchRequest, FetchResultSet};
use super::reporter::{FetchEvent, FetchReporter, TracingReporter};
use super::retry::RetryPolicy;

/// Concurrent fetcher for an ordered batch of URLs.
///
/// # Concurrency Model
///
/// - Each request runs in its own Tokio task with its own retry loop
/// - A semaphore permit is held for each HTTP attempt only, capping the
///   number of requests in flight; backoff sleeps hold no permit
/// - One [`HttpClient`] is built per batch and shared by all tasks
/// - A failed or panicked task never affects its siblings
pub struct ConcurrentFetcher {
    /// Configured concurrency limit.
    concurrency: usize,
    /// Retry policy for every unit of work.
    policy: RetryPolicy,
    /// Settings for the per-batch client.
    settings: ClientSettings,
    /// Event sink shared by all units of work.
    reporter: Arc<dyn FetchReporter>,
    /// Origin for progress timings; defaults to the batch start.
    start_time: Option<Instant>,
}

impl fmt::Debug for ConcurrentFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentFetcher")
            .field("concurrency", &self.concurrency)
            .field("policy", &self.policy)
            .field("settings", &self.settings)
            .field("start_time", &self.start_time)
            .finish_non_exhaustive()
    }
}

impl ConcurrentFetcher {
    /// Creates a fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConcurrency`] if `concurrency` is outside
    /// the valid range (1-100).
    #[instrument(level = "debug", skip(policy, settings, reporter))]
    pub fn new(
        concurrency: usize,
        policy: RetryPolicy,
        settings: ClientSettings,
        reporter: Arc<dyn FetchReporter>,
    ) -> Result<Self, BatchError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(BatchError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = policy.max_attempts(),
            "creating concurrent fetcher"
        );

        Ok(Self {
            concurrency,
            policy,
            settings,
            reporter,
            start_time: None,
        })
    }

    /// Creates a fetcher with default policy, settings and a tracing reporter.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConcurrency`] for an out-of-range value.
    pub fn with_concurrency(concurrency: usize) -> Result<Self, BatchError> {
        Self::new(
            concurrency,
            RetryPolicy::concurrent(),
            ClientSettings::default(),
            Arc::new(TracingReporter),
        )
    }

    /// Sets the origin used for elapsed times in progress events.
    #[must_use]
    pub fn with_start_time(mut self, start_time: Instant) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Numbers `urls` in order and fetches them.
    pub async fn fetch_urls<S: AsRef<str>>(&self, urls: &[S]) -> FetchResultSet {
        let requests = FetchRequest::from_urls(urls.iter().map(|u| u.as_ref().to_string()));
        self.fetch_all(&requests).await
    }

    /// Fetches every request concurrently and returns outcomes in request order.
    ///
    /// Never fails: each slot holds the outcome of its own request, and the
    /// result always has `requests.len()` entries.
    #[instrument(skip(self, requests), fields(total = requests.len(), concurrency = self.concurrency))]
    pub async fn fetch_all(&self, requests: &[FetchRequest]) -> FetchResultSet {
        let batch_started = Instant::now();
        let progress_origin = self.start_time.unwrap_or(batch_started);
        let total = requests.len();
        let retried = Arc::new(AtomicUsize::new(0));

        self.reporter.report(&FetchEvent::BatchStarted {
            total,
            concurrency: self.concurrency,
        });

        let outcomes = match HttpClient::new(&self.settings) {
            Ok(client) => {
                self.run_batch(client, requests, progress_origin, &retried)
                    .await
            }
            Err(e) => {
                warn!(error = %e, "cannot build HTTP client; every request resolves to an empty record");
                requests
                    .iter()
                    .map(|_| FetchOutcome::Exhausted {
                        attempts: 0,
                        last_error: e.to_string(),
                    })
                    .collect()
            }
        };

        let results = FetchResultSet::new(
            outcomes,
            batch_started.elapsed(),
            retried.load(Ordering::SeqCst),
        );
        self.reporter.report(&FetchEvent::BatchFinished {
            elapsed: results.elapsed(),
            summary: results.summary(),
        });
        results
    }

    async fn run_batch(
        &self,
        client: HttpClient,
        requests: &[FetchRequest],
        started: Instant,
        retried: &Arc<AtomicUsize>,
    ) -> Vec<FetchOutcome> {
        let total = requests.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(total);

        // Launch position within this slice drives progress and placement
        for (index, request) in requests.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let client = client.clone();
            let policy = self.policy.clone();
            let reporter = Arc::clone(&self.reporter);
            let retried = Arc::clone(retried);
            let position = BatchPosition {
                index,
                total,
                started,
            };
            let url = request.url().to_string();

            handles.push(tokio::spawn(async move {
                let ctx = AttemptContext {
                    client: &client,
                    policy: &policy,
                    reporter: reporter.as_ref(),
                    retried: &retried,
                    permits: Some(semaphore.as_ref()),
                };
                run_attempts(&ctx, &url, Some(position)).await
            }));
        }

        debug!(task_count = handles.len(), "waiting for fetches to complete");

        // join_all yields results in handle order, which is request order
        join_all(handles)
            .await
            .into_iter()
            .zip(requests)
            .enumerate()
            .map(|(index, (joined, request))| {
                joined.unwrap_or_else(|e| {
                    warn!(index, url = request.url(), error = %e, "fetch task panicked");
                    FetchOutcome::Exhausted {
                        attempts: 0,
                        last_error: format!("fetch task failed: {e}"),
                    }
                })
            })
            .collect()
    }
}
