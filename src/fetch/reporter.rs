//! Observability handle passed into every unit of work.
//!
//! Fetchers never log directly. They emit [`FetchEvent`]s to an
//! `Arc<dyn FetchReporter>` owned by the caller, so a batch can be observed by
//! tracing, a progress bar, or a test recorder without global state.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::outcome::BatchSummary;

/// Progress of one successful request within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Zero-based launch position.
    pub index: usize,
    /// Batch size.
    pub total: usize,
    /// Time since the batch start.
    pub elapsed: Duration,
    /// HTTP status of the successful response.
    pub status: u16,
    /// URL with scheme and host stripped.
    pub endpoint: String,
}

impl Progress {
    /// Share of the batch completed, by launch position.
    #[must_use]
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let percent = ((self.index + 1) as f64 / self.total as f64 * 100.0).round() as u32;
        percent
    }

    /// 1-based ordinal of the request.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.index + 1
    }
}

/// Structured events emitted while fetching.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    /// A batch is about to launch its units of work.
    BatchStarted {
        /// Requests in the batch.
        total: usize,
        /// Concurrency limit.
        concurrency: usize,
    },

    /// An attempt failed transiently and a retry is scheduled.
    RetryScheduled {
        /// Batch position, `None` for a standalone fetch.
        index: Option<usize>,
        /// URL being fetched.
        url: String,
        /// Attempt that just failed (1-indexed).
        attempt: u32,
        /// Attempt budget.
        max_attempts: u32,
        /// Attempts left after this failure.
        attempts_left: u32,
        /// Backoff before the next attempt.
        delay: Duration,
        /// Display form of the attempt error.
        error: String,
    },

    /// A request returned 200 with a JSON body.
    Succeeded {
        /// Batch position, `None` for a standalone fetch.
        index: Option<usize>,
        /// URL fetched.
        url: String,
        /// Attempt that succeeded (1-indexed).
        attempt: u32,
        /// Batch progress, present for batch requests.
        progress: Option<Progress>,
    },

    /// A request returned 403 and will not be retried.
    Forbidden {
        /// Batch position, `None` for a standalone fetch.
        index: Option<usize>,
        /// URL fetched.
        url: String,
        /// Attempt that was refused (1-indexed).
        attempt: u32,
    },

    /// A request ran out of attempts.
    Exhausted {
        /// Batch position, `None` for a standalone fetch.
        index: Option<usize>,
        /// URL fetched.
        url: String,
        /// Attempts made.
        attempts: u32,
    },

    /// All units of work in a batch have finished.
    BatchFinished {
        /// Wall-clock duration of the batch.
        elapsed: Duration,
        /// Outcome counts.
        summary: BatchSummary,
    },
}

/// Receives [`FetchEvent`]s from fetchers; must tolerate concurrent callers.
pub trait FetchReporter: Send + Sync {
    /// Handles one event.
    fn report(&self, event: &FetchEvent);
}

/// Emits events as `tracing` log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FetchReporter for TracingReporter {
    fn report(&self, event: &FetchEvent) {
        match event {
            FetchEvent::BatchStarted { total, concurrency } => {
                info!(total, concurrency, "starting fetch batch");
            }
            FetchEvent::RetryScheduled {
                index,
                url,
                attempt,
                max_attempts,
                attempts_left,
                delay,
                error,
            } => {
                warn!(
                    index = ?index,
                    url = %url,
                    attempt,
                    max_attempts,
                    attempts_left,
                    delay_secs = delay.as_secs_f64(),
                    error = %error,
                    "Error: {error} - {url} - {attempts_left} attempts left. Waiting for {} seconds...",
                    delay.as_secs_f64()
                );
            }
            FetchEvent::Succeeded {
                url,
                attempt,
                progress: Some(progress),
                ..
            } => {
                let elapsed = format_elapsed(progress.elapsed);
                info!(
                    percent = progress.percent(),
                    elapsed = %elapsed,
                    ordinal = progress.ordinal(),
                    total = progress.total,
                    status = progress.status,
                    endpoint = %progress.endpoint,
                    attempt,
                    "{}% --- Time elapsed: {elapsed} --- Item #{} / {} --- Status: {} --- Endpoint: {}",
                    progress.percent(),
                    progress.ordinal(),
                    progress.total,
                    progress.status,
                    progress.endpoint
                );
                debug!(url = %url, "batch request succeeded");
            }
            FetchEvent::Succeeded {
                url,
                attempt,
                progress: None,
                ..
            } => {
                debug!(url = %url, attempt, "fetch succeeded");
            }
            FetchEvent::Forbidden { index, url, attempt } => {
                info!(index = ?index, url = %url, attempt, "forbidden (HTTP 403); returning empty record");
            }
            FetchEvent::Exhausted {
                index,
                url,
                attempts,
            } => {
                info!(
                    index = ?index,
                    url = %url,
                    attempts,
                    "Failed to fetch data after {attempts} attempts. Returning empty record."
                );
            }
            FetchEvent::BatchFinished { elapsed, summary } => {
                info!(
                    elapsed = %format_elapsed(*elapsed),
                    total = summary.total,
                    succeeded = summary.succeeded,
                    forbidden = summary.forbidden,
                    exhausted = summary.exhausted,
                    retried = summary.retried,
                    "*** Fetch batch lasted: {} ***",
                    format_elapsed(*elapsed)
                );
            }
        }
    }
}

/// Formats a duration as `"{minutes}min {seconds:.2}sec"`.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64();
    let minutes = (total / 60.0).floor();
    let seconds = total - minutes * 60.0;
    format!("{minutes:.0}min {seconds:.2}sec")
}

/// Strips scheme and host: everything after the third `/`.
#[must_use]
pub fn endpoint(url: &str) -> String {
    url.split('/').skip(3).collect::<Vec<_>>().join("/")
}
