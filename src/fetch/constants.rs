//! Constants for the fetch module (timeouts, retry budget, batch sizing).

use std::time::Duration;

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout (30 seconds; payloads are small JSON documents).
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Default attempt budget per URL, including the first attempt.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Linear backoff step added per failed attempt.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(500);

/// Default number of requests allowed in flight within one batch.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;
