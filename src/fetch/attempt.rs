//! Per-request retry state machine.
//!
//! ```text
//! Attempting ──ok──────────────▶ Succeeded
//!     │ ├──403─────────────────▶ ForbiddenTerminal
//!     │ └──transient, budget ──▶ RetryScheduled ──sleep──▶ Attempting
//!     └────transient, spent ───▶ ExhaustedTerminal
//! ```
//!
//! Both fetchers drive the same machine; they differ only in the
//! [`RetryPolicy`] schedule and whether a batch position is attached.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

use super::client::HttpClient;
use super::error::FetchError;
use super::outcome::FetchOutcome;
use super::reporter::{FetchEvent, FetchReporter, Progress, endpoint};
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};

/// Position of a unit of work inside a batch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BatchPosition {
    pub(crate) index: usize,
    pub(crate) total: usize,
    pub(crate) started: Instant,
}

#[derive(Debug)]
enum AttemptState {
    Attempting { attempt: u32 },
    RetryScheduled { attempt: u32, delay: Duration },
    Succeeded { attempt: u32, payload: Value },
    ForbiddenTerminal { attempt: u32 },
    ExhaustedTerminal { attempts: u32, last_error: String },
}

/// Shared collaborators of one unit of work.
pub(crate) struct AttemptContext<'a> {
    pub(crate) client: &'a HttpClient,
    pub(crate) policy: &'a RetryPolicy,
    pub(crate) reporter: &'a dyn FetchReporter,
    pub(crate) retried: &'a AtomicUsize,
    /// Batch-wide limit on requests in flight. A permit covers one HTTP
    /// attempt and is released before the backoff sleep.
    pub(crate) permits: Option<&'a Semaphore>,
}

/// Folds the result of one attempt into the next state.
fn transition(
    policy: &RetryPolicy,
    attempt: u32,
    result: Result<Value, FetchError>,
) -> (AttemptState, Option<FetchError>) {
    let error = match result {
        Ok(payload) => return (AttemptState::Succeeded { attempt, payload }, None),
        Err(error) => error,
    };

    let failure_type = classify_error(&error);
    let next = match policy.should_retry(failure_type, attempt) {
        RetryDecision::Retry { delay, .. } => AttemptState::RetryScheduled { attempt, delay },
        RetryDecision::DoNotRetry { reason } => {
            debug!(attempt, %reason, "not retrying");
            if failure_type == FailureType::Forbidden {
                AttemptState::ForbiddenTerminal { attempt }
            } else {
                AttemptState::ExhaustedTerminal {
                    attempts: attempt,
                    last_error: error.to_string(),
                }
            }
        }
    };
    (next, Some(error))
}

/// Runs attempts for `url` until a terminal state is reached.
#[instrument(level = "debug", skip(ctx, position), fields(index = ?position.map(|p| p.index)))]
pub(crate) async fn run_attempts(
    ctx: &AttemptContext<'_>,
    url: &str,
    position: Option<BatchPosition>,
) -> FetchOutcome {
    let index = position.map(|p| p.index);
    let mut state = AttemptState::Attempting { attempt: 1 };

    loop {
        state = match state {
            AttemptState::Attempting { attempt } => {
                let result = match ctx.permits {
                    Some(permits) => match permits.acquire().await {
                        Ok(_permit) => ctx.client.get_json(url).await,
                        Err(_) => {
                            ctx.reporter.report(&FetchEvent::Exhausted {
                                index,
                                url: url.to_string(),
                                attempts: attempt - 1,
                            });
                            return FetchOutcome::Exhausted {
                                attempts: attempt - 1,
                                last_error: "batch semaphore closed".to_string(),
                            };
                        }
                    },
                    None => ctx.client.get_json(url).await,
                };
                let (next, error) = transition(ctx.policy, attempt, result);
                if let (AttemptState::RetryScheduled { delay, .. }, Some(error)) = (&next, &error) {
                    ctx.retried.fetch_add(1, Ordering::SeqCst);
                    ctx.reporter.report(&FetchEvent::RetryScheduled {
                        index,
                        url: url.to_string(),
                        attempt,
                        max_attempts: ctx.policy.max_attempts(),
                        attempts_left: ctx.policy.attempts_remaining(attempt).saturating_sub(1),
                        delay: *delay,
                        error: error.to_string(),
                    });
                }
                next
            }
            AttemptState::RetryScheduled { attempt, delay } => {
                tokio::time::sleep(delay).await;
                AttemptState::Attempting {
                    attempt: attempt + 1,
                }
            }
            AttemptState::Succeeded { attempt, payload } => {
                let progress = position.map(|p| Progress {
                    index: p.index,
                    total: p.total,
                    elapsed: p.started.elapsed(),
                    status: 200,
                    endpoint: endpoint(url),
                });
                ctx.reporter.report(&FetchEvent::Succeeded {
                    index,
                    url: url.to_string(),
                    attempt,
                    progress,
                });
                return FetchOutcome::Success(payload);
            }
            AttemptState::ForbiddenTerminal { attempt } => {
                ctx.reporter.report(&FetchEvent::Forbidden {
                    index,
                    url: url.to_string(),
                    attempt,
                });
                return FetchOutcome::Forbidden;
            }
            AttemptState::ExhaustedTerminal {
                attempts,
                last_error,
            } => {
                ctx.reporter.report(&FetchEvent::Exhausted {
                    index,
                    url: url.to_string(),
                    attempts,
                });
                return FetchOutcome::Exhausted {
                    attempts,
                    last_error,
                };
            }
        };
    }
}
