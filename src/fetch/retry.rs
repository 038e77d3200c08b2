//! Retry policy with linear backoff for transient fetch failures.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types shared by
//! the single and concurrent fetchers.
//!
//! # Overview
//!
//! When an attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Forbidden`] - HTTP 403, the service asks us not to retry
//! - [`FailureType::Transient`] - everything else (other statuses, transport
//!   errors, unparseable bodies)
//!
//! The [`RetryPolicy`] then decides whether to retry and how long to wait.
//! Backoff is linear with a fixed step and no jitter. The listing fetch and
//! the detail batch count their attempts in opposite directions; see
//! [`BackoffSchedule`].
//!
//! # Example
//!
//! ```
//! use filmfetch_core::fetch::{FetchError, FailureType, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::concurrent();
//! let error = FetchError::http_status("http://example.com/films/1", 500);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::FetchError;
use super::constants::{DEFAULT_BACKOFF_STEP, DEFAULT_MAX_ATTEMPTS};

/// Classification of fetch failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// HTTP 403: terminal, never retried.
    Forbidden,

    /// Any other failure; retried until the attempt budget is spent.
    Transient,
}

/// Shape of the linear backoff.
///
/// Both shapes yield `step, 2 * step, 3 * step, ...` for any budget; they only
/// differ in which counter the wait is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffSchedule {
    /// `step * (max_attempts + 1 - attempts_remaining)`, where
    /// `attempts_remaining` is the budget before the failed attempt is
    /// deducted. Used for the listing fetch.
    RemainingBudget,

    /// `step * (attempt_index + 1)` with a zero-based attempt index. Used for
    /// the detail batch.
    AttemptIndex,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with linear backoff.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `step`: 500ms
/// - `schedule`: [`BackoffSchedule::AttemptIndex`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Backoff step.
    step: Duration,

    /// Which linear formula computes the wait.
    schedule: BackoffSchedule,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::concurrent()
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, step: Duration, schedule: BackoffSchedule) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step,
            schedule,
        }
    }

    /// Policy used by the listing fetch (remaining-budget schedule).
    #[must_use]
    pub fn single() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BACKOFF_STEP,
            BackoffSchedule::RemainingBudget,
        )
    }

    /// Policy used by the detail batch (attempt-index schedule).
    #[must_use]
    pub fn concurrent() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BACKOFF_STEP,
            BackoffSchedule::AttemptIndex,
        )
    }

    /// Returns a copy with a different attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns a copy with a different backoff step.
    #[must_use]
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the backoff step.
    #[must_use]
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Returns the backoff schedule.
    #[must_use]
    pub fn schedule(&self) -> BackoffSchedule {
        self.schedule
    }

    /// Attempts left before `attempt` (1-indexed) is deducted.
    #[must_use]
    pub fn attempts_remaining(&self, attempt: u32) -> u32 {
        self.max_attempts.saturating_sub(attempt.saturating_sub(1))
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(level = "trace", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Forbidden {
            return RetryDecision::DoNotRetry {
                reason: "forbidden - server asked not to retry".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.delay_after(attempt),
            attempt: attempt + 1,
        }
    }

    /// Wait after `attempt` (1-indexed) failed.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = match self.schedule {
            BackoffSchedule::AttemptIndex => attempt,
            BackoffSchedule::RemainingBudget => {
                (self.max_attempts + 1).saturating_sub(self.attempts_remaining(attempt))
            }
        };
        self.step * factor
    }
}

/// Classifies an HTTP status code.
///
/// Returns `None` for 200, which is the only success status.
#[must_use]
pub fn classify_status(status: u16) -> Option<FailureType> {
    match status {
        200 => None,
        403 => Some(FailureType::Forbidden),
        _ => Some(FailureType::Transient),
    }
}

/// Classifies an attempt error into a failure type for retry decisions.
///
/// Only an HTTP 403 is terminal. Transport errors, timeouts, malformed URLs,
/// body parse errors and every other status are transient.
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    error
        .status()
        .and_then(classify_status)
        .unwrap_or(FailureType::Transient)
}
