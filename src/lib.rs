//! Filmfetch Core Library
//!
//! This library retrieves the public film dataset: a listing of ceremonies
//! and nominated films plus one detail page per film, all served as JSON
//! over HTTP, and turns it into flat CSV tables.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Retry-aware single and concurrent JSON fetchers
//! - [`pipeline`] - Listing explosion, detail merging, cleaning and CSV output

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fetch;
pub mod pipeline;
mod user_agent;

// Re-export commonly used types
pub use fetch::{
    BackoffSchedule, BatchError, BatchSummary, ClientSettings, ConcurrentFetcher,
    DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, FailureType, FetchError, FetchEvent, FetchOutcome,
    FetchReporter, FetchRequest, FetchResultSet, RetryPolicy, SingleFetcher, TracingReporter,
};
pub use pipeline::{Pipeline, PipelineError, PipelineOptions, PipelineReport};
