//! Request and outcome types shared by both fetchers.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

/// One URL in an ordered batch.
///
/// Requests are only built by [`FetchRequest::from_urls`], so `index` always
/// equals the position of the URL in the list it was numbered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    index: usize,
    url: String,
}

impl FetchRequest {
    /// Numbers `urls` in order.
    pub fn from_urls<I, S>(urls: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        urls.into_iter()
            .enumerate()
            .map(|(index, url)| Self {
                index,
                url: url.into(),
            })
            .collect()
    }

    /// Position in the list the request was numbered from.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Opaque absolute URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Terminal state of one fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// HTTP 200 with a parsed JSON body.
    Success(Value),

    /// HTTP 403; not retried.
    Forbidden,

    /// Transient failures persisted past the attempt budget.
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Display form of the last attempt error.
        last_error: String,
    },
}

impl FetchOutcome {
    /// Returns `true` for [`FetchOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Borrows the payload of a successful fetch.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Short label for logs and summaries.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Forbidden => "forbidden",
            Self::Exhausted { .. } => "exhausted",
        }
    }

    /// Erases the failure kind: failures become an empty JSON object.
    #[must_use]
    pub fn into_record(self) -> Value {
        match self {
            Self::Success(value) => value,
            Self::Forbidden | Self::Exhausted { .. } => empty_record(),
        }
    }
}

/// The record handed downstream for any failed fetch.
#[must_use]
pub fn empty_record() -> Value {
    Value::Object(Map::new())
}

/// Outcome counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Requests submitted.
    pub total: usize,
    /// Requests that returned 200.
    pub succeeded: usize,
    /// Requests that returned 403.
    pub forbidden: usize,
    /// Requests that ran out of attempts.
    pub exhausted: usize,
    /// Retry waits taken across the batch.
    pub retried: usize,
}

/// Ordered outcomes of one batch; `outcomes()[i]` belongs to request `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResultSet {
    outcomes: Vec<FetchOutcome>,
    elapsed: Duration,
    retried: usize,
}

impl FetchResultSet {
    pub(crate) fn new(outcomes: Vec<FetchOutcome>, elapsed: Duration, retried: usize) -> Self {
        Self {
            outcomes,
            elapsed,
            retried,
        }
    }

    /// Number of outcomes (equal to the number of requests).
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns `true` when the batch was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcomes in request order.
    #[must_use]
    pub fn outcomes(&self) -> &[FetchOutcome] {
        &self.outcomes
    }

    /// Wall-clock duration of the batch.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Counts outcomes by kind.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.outcomes.len(),
            retried: self.retried,
            ..BatchSummary::default()
        };
        for outcome in &self.outcomes {
            match outcome {
                FetchOutcome::Success(_) => summary.succeeded += 1,
                FetchOutcome::Forbidden => summary.forbidden += 1,
                FetchOutcome::Exhausted { .. } => summary.exhausted += 1,
            }
        }
        summary
    }

    /// Converts to downstream records, failures as empty objects.
    #[must_use]
    pub fn into_records(self) -> Vec<Value> {
        self.outcomes
            .into_iter()
            .map(FetchOutcome::into_record)
            .collect()
    }
}

impl IntoIterator for FetchResultSet {
    type Item = FetchOutcome;
    type IntoIter = std::vec::IntoIter<FetchOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}
