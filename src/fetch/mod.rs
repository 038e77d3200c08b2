//! Reliable retrieval of JSON documents over HTTP.
//!
//! This module provides the two fetchers used by the extraction pipeline:
//!
//! - [`SingleFetcher`] fetches one URL (the dataset listing)
//! - [`ConcurrentFetcher`] fetches an ordered batch of URLs (the detail pages)
//!   with bounded concurrency, returning outcomes in request order
//!
//! # Features
//!
//! - Linear backoff retry of transient failures (5 attempts by default)
//! - HTTP 403 treated as terminal, never retried
//! - Failures never escape: every request resolves to a [`FetchOutcome`],
//!   erased to an empty record at the downstream boundary
//! - Progress and retry events delivered to an explicit [`FetchReporter`]
//!
//! # Example
//!
//! ```no_run
//! use filmfetch_core::fetch::{ConcurrentFetcher, SingleFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let listing = SingleFetcher::default().fetch("http://oscars.yipitdata.com/").await;
//! let fetcher = ConcurrentFetcher::with_concurrency(20)?;
//! let details = fetcher
//!     .fetch_urls(&["http://oscars.yipitdata.com/films/1"])
//!     .await
//!     .into_records();
//! println!("{listing} {details:?}");
//! # Ok(())
//! # }
//! ```

mod attempt;
mod client;
mod concurrent;
pub mod constants;
mod error;
mod outcome;
pub mod reporter;
mod retry;
mod single;

pub use client::{ClientSettings, HttpClient};
pub use concurrent::ConcurrentFetcher;
pub use constants::{DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS};
pub use error::{BatchError, FetchError};
pub use outcome::{BatchSummary, FetchOutcome, FetchRequest, FetchResultSet, empty_record};
pub use reporter::{FetchEvent, FetchReporter, Progress, TracingReporter};
pub use retry::{
    BackoffSchedule, FailureType, RetryDecision, RetryPolicy, classify_error, classify_status,
};
pub use single::SingleFetcher;
