//! Standalone fetch of one URL with bounded retry.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use serde_json::Value;
use tracing::{instrument, warn};

use super::attempt::{AttemptContext, run_attempts};
use super::client::{ClientSettings, HttpClient};
use super::outcome::FetchOutcome;
use super::reporter::{FetchReporter, TracingReporter};
use super::retry::RetryPolicy;

/// Fetches exactly one URL, retrying transient failures.
///
/// A fresh [`HttpClient`] is built for every call and dropped when it
/// returns. The call never fails: a 403 or an exhausted budget yields an empty
/// record from [`fetch`](Self::fetch), while
/// [`fetch_outcome`](Self::fetch_outcome) keeps the distinction.
///
/// # Example
///
/// ```no_run
/// use filmfetch_core::fetch::SingleFetcher;
///
/// # async fn example() {
/// let fetcher = SingleFetcher::default();
/// let listing = fetcher.fetch("http://oscars.yipitdata.com/").await;
/// println!("{listing}");
/// # }
/// ```
#[derive(Clone)]
pub struct SingleFetcher {
    policy: RetryPolicy,
    settings: ClientSettings,
    reporter: Arc<dyn FetchReporter>,
}

impl fmt::Debug for SingleFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFetcher")
            .field("policy", &self.policy)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Default for SingleFetcher {
    fn default() -> Self {
        Self::new(
            RetryPolicy::single(),
            ClientSettings::default(),
            Arc::new(TracingReporter),
        )
    }
}

impl SingleFetcher {
    /// Creates a fetcher.
    #[must_use]
    pub fn new(
        policy: RetryPolicy,
        settings: ClientSettings,
        reporter: Arc<dyn FetchReporter>,
    ) -> Self {
        Self {
            policy,
            settings,
            reporter,
        }
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches `url`, returning its JSON payload or an empty record.
    pub async fn fetch(&self, url: &str) -> Value {
        self.fetch_outcome(url).await.into_record()
    }

    /// Fetches `url`, returning the tagged outcome.
    #[instrument(skip(self), fields(max_attempts = self.policy.max_attempts()))]
    pub async fn fetch_outcome(&self, url: &str) -> FetchOutcome {
        let client = match HttpClient::new(&self.settings) {
            Ok(client) => client,
            Err(e) => {
                warn!(url = %url, error = %e, "cannot build HTTP client; returning empty record");
                return FetchOutcome::Exhausted {
                    attempts: 0,
                    last_error: e.to_string(),
                };
            }
        };

        let retried = AtomicUsize::new(0);
        let ctx = AttemptContext {
            client: &client,
            policy: &self.policy,
            reporter: self.reporter.as_ref(),
            retried: &retried,
            permits: None,
        };
        run_attempts(&ctx, url, None).await
    }
}
