//! Integration tests for the single and concurrent fetchers.
//!
//! These tests run the fetchers against a mock HTTP server and check ordering,
//! retry budgets, backoff schedules and 403 handling through a recording
//! reporter instead of wall-clock measurements.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use filmfetch_core::fetch::{
    ClientSettings, ConcurrentFetcher, FetchEvent, FetchOutcome, FetchRequest, RetryPolicy,
    SingleFetcher,
};
use rand::Rng;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, Request, Respond, ResponseTemplate};

mod support;
use support::recording::RecordingReporter;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return socket_skip_return();
        };
        mock_server
    }};
}

const STEP: Duration = Duration::from_millis(10);

// ==================== Helper Functions ====================

fn fast_policy() -> RetryPolicy {
    RetryPolicy::concurrent().with_step(STEP)
}

fn concurrent_fetcher(
    concurrency: usize,
    reporter: &Arc<RecordingReporter>,
) -> Result<ConcurrentFetcher, Box<dyn std::error::Error>> {
    Ok(ConcurrentFetcher::new(
        concurrency,
        fast_policy(),
        ClientSettings::default(),
        Arc::clone(reporter) as _,
    )?)
}

fn single_fetcher(reporter: &Arc<RecordingReporter>) -> SingleFetcher {
    SingleFetcher::new(
        RetryPolicy::single().with_step(STEP),
        ClientSettings::default(),
        Arc::clone(reporter) as _,
    )
}

/// Fails with `failures` transient statuses before answering 200.
struct FlakyResponder {
    calls: AtomicUsize,
    failures: usize,
    body: serde_json::Value,
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            ResponseTemplate::new(503)
        } else {
            ResponseTemplate::new(200).set_body_json(self.body.clone())
        }
    }
}

// ==================== Ordering Tests ====================

#[tokio::test]
async fn test_results_follow_request_order_under_random_delays()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    let total = 12;
    let mut rng = rand::thread_rng();

    for i in 0..total {
        let delay = Duration::from_millis(rng.gen_range(0..120));
        Mock::given(method("GET"))
            .and(path(format!("/films/{i}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": i}))
                    .set_delay(delay),
            )
            .mount(&mock_server)
            .await;
    }

    let urls: Vec<String> = (0..total)
        .map(|i| format!("{}/films/{i}", mock_server.uri()))
        .collect();
    let reporter = RecordingReporter::shared();
    let fetcher = concurrent_fetcher(total, &reporter)?;

    let records = fetcher.fetch_urls(&urls).await.into_records();

    assert_eq!(records.len(), total);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record, &json!({"id": i}), "slot {i} holds another response");
    }
    let mut indices = reporter.succeeded_indices();
    indices.sort_unstable();
    assert_eq!(indices, (0..total).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
async fn test_concurrency_limit_below_batch_size_still_completes()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .set_delay(Duration::from_millis(20)),
        )
        .expect(6)
        .mount(&mock_server)
        .await;

    let urls: Vec<String> = (0..6)
        .map(|i| format!("{}/films/{i}", mock_server.uri()))
        .collect();
    let reporter = RecordingReporter::shared();
    let results = concurrent_fetcher(2, &reporter)?.fetch_urls(&urls).await;

    assert_eq!(results.summary().succeeded, 6);
    Ok(())
}

// ==================== Forbidden Tests ====================

#[tokio::test]
async fn test_forbidden_is_requested_once_without_backoff()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/films/locked"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/films/locked", mock_server.uri());
    let reporter = RecordingReporter::shared();
    let results = concurrent_fetcher(4, &reporter)?.fetch_urls(&[&url]).await;

    assert_eq!(results.outcomes(), &[FetchOutcome::Forbidden]);
    assert_eq!(reporter.retry_count(), 0);
    assert_eq!(results.into_records(), vec![json!({})]);
    Ok(())
}

// ==================== Retry Budget Tests ====================

#[tokio::test]
async fn test_persistent_server_error_exhausts_after_five_attempts()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/films/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&mock_server)
        .await;

    let url = format!("{}/films/broken", mock_server.uri());
    let reporter = RecordingReporter::shared();
    let results = concurrent_fetcher(4, &reporter)?.fetch_urls(&[&url]).await;

    assert!(matches!(
        results.outcomes(),
        [FetchOutcome::Exhausted { attempts: 5, .. }]
    ));
    assert_eq!(
        reporter.retry_delays(&url),
        vec![STEP, STEP * 2, STEP * 3, STEP * 4]
    );
    assert_eq!(results.summary().retried, 4);
    assert_eq!(results.into_records(), vec![json!({})]);
    Ok(())
}

#[tokio::test]
async fn test_two_failures_then_success() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/films/flaky"))
        .respond_with(FlakyResponder {
            calls: AtomicUsize::new(0),
            failures: 2,
            body: json!({"a": 1}),
        })
        .expect(3)
        .mount(&mock_server)
        .await;

    let url = format!("{}/films/flaky", mock_server.uri());
    let reporter = RecordingReporter::shared();
    let results = concurrent_fetcher(1, &reporter)?.fetch_urls(&[&url]).await;

    assert_eq!(results.outcomes(), &[FetchOutcome::Success(json!({"a": 1}))]);
    assert_eq!(reporter.retry_delays(&url), vec![STEP, STEP * 2]);
    let attempts_left: Vec<u32> = reporter
        .events()
        .into_iter()
        .filter_map(|event| match event {
            FetchEvent::RetryScheduled { attempts_left, .. } => Some(attempts_left),
            _ => None,
        })
        .collect();
    assert_eq!(attempts_left, vec![4, 3]);
    Ok(())
}

#[tokio::test]
async fn test_invalid_json_body_is_retried() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/films/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let url = format!("{}/films/garbled", mock_server.uri());
    let reporter = RecordingReporter::shared();
    let fetcher = ConcurrentFetcher::new(
        1,
        fast_policy().with_max_attempts(2),
        ClientSettings::default(),
        Arc::clone(&reporter) as _,
    )?;
    let results = fetcher.fetch_urls(&[&url]).await;

    assert!(matches!(
        results.outcomes(),
        [FetchOutcome::Exhausted { attempts: 2, .. }]
    ));
    Ok(())
}

// ==================== Independence Tests ====================

#[tokio::test]
async fn test_failures_do_not_affect_siblings() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/films/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"film": "a"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/films/b"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/films/c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"film": "c"})))
        .mount(&mock_server)
        .await;

    let base = mock_server.uri();
    let urls = [
        format!("{base}/films/a"),
        format!("{base}/films/b"),
        format!("{base}/films/c"),
    ];
    let reporter = RecordingReporter::shared();
    let results = concurrent_fetcher(3, &reporter)?.fetch_urls(&urls).await;

    assert_eq!(
        results.outcomes(),
        &[
            FetchOutcome::Success(json!({"film": "a"})),
            FetchOutcome::Forbidden,
            FetchOutcome::Success(json!({"film": "c"})),
        ]
    );
    let summary = results.summary();
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.forbidden, 1);
    assert_eq!(summary.exhausted, 0);
    Ok(())
}

#[tokio::test]
async fn test_batch_events_bracket_the_run() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let urls = [format!("{}/films/1", mock_server.uri())];
    let reporter = RecordingReporter::shared();
    concurrent_fetcher(5, &reporter)?.fetch_urls(&urls).await;

    let events = reporter.events();
    assert!(matches!(
        events.first(),
        Some(FetchEvent::BatchStarted {
            total: 1,
            concurrency: 5
        })
    ));
    assert!(matches!(events.last(), Some(FetchEvent::BatchFinished { .. })));
    let progress = events.iter().find_map(|event| match event {
        FetchEvent::Succeeded {
            progress: Some(progress),
            ..
        } => Some(progress.clone()),
        _ => None,
    });
    let progress = progress.expect("batch success carries progress");
    assert_eq!(progress.percent(), 100);
    assert_eq!(progress.status, 200);
    assert_eq!(progress.endpoint, "films/1");
    Ok(())
}

#[tokio::test]
async fn test_backoff_sleep_does_not_hold_a_concurrency_slot()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/films/bad"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/films/good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"film": "good"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let slow_step = Duration::from_millis(200);
    let base = mock_server.uri();
    let reporter = RecordingReporter::shared();
    let fetcher = ConcurrentFetcher::new(
        1,
        RetryPolicy::concurrent().with_step(slow_step),
        ClientSettings::default(),
        Arc::clone(&reporter) as _,
    )?;
    let results = fetcher
        .fetch_urls(&[format!("{base}/films/bad"), format!("{base}/films/good")])
        .await;

    assert!(matches!(
        results.outcomes()[0],
        FetchOutcome::Exhausted { attempts: 5, .. }
    ));
    assert_eq!(results.outcomes()[1], FetchOutcome::Success(json!({"film": "good"})));

    // The bad URL sleeps 1+2+3+4 steps in total; the good one must not wait for it
    let good_elapsed = reporter
        .events()
        .into_iter()
        .find_map(|event| match event {
            FetchEvent::Succeeded {
                progress: Some(progress),
                ..
            } => Some(progress.elapsed),
            _ => None,
        })
        .expect("good URL succeeded");
    assert!(
        good_elapsed < slow_step * 3,
        "good URL finished after {good_elapsed:?}"
    );

    let events = reporter.events();
    let succeeded_at = events
        .iter()
        .position(|e| matches!(e, FetchEvent::Succeeded { .. }));
    let exhausted_at = events
        .iter()
        .position(|e| matches!(e, FetchEvent::Exhausted { .. }));
    assert!(succeeded_at < exhausted_at);
    Ok(())
}

#[tokio::test]
async fn test_sub_batch_numbers_requests_by_launch_position()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let base = mock_server.uri();
    let requests = FetchRequest::from_urls(
        (0..4).map(|i| format!("{base}/films/{i}")),
    );
    let reporter = RecordingReporter::shared();
    let results = concurrent_fetcher(2, &reporter)?
        .fetch_all(&requests[2..])
        .await;

    assert_eq!(results.len(), 2);
    let mut progress: Vec<(usize, u32, String)> = reporter
        .events()
        .into_iter()
        .filter_map(|event| match event {
            FetchEvent::Succeeded {
                progress: Some(p), ..
            } => Some((p.ordinal(), p.percent(), p.endpoint)),
            _ => None,
        })
        .collect();
    progress.sort();
    assert_eq!(
        progress,
        vec![
            (1, 50, "films/2".to_string()),
            (2, 100, "films/3".to_string())
        ]
    );
    Ok(())
}

// ==================== Single Fetcher Tests ====================

#[tokio::test]
async fn test_single_fetch_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    let listing = json!({"results": [{"year": "1929", "films": []}]});
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing.clone()))
        .expect(2)
        .mount(&mock_server)
        .await;

    let url = format!("{}/", mock_server.uri());
    let reporter = RecordingReporter::shared();
    let fetcher = single_fetcher(&reporter);

    assert_eq!(fetcher.fetch(&url).await, listing);
    assert_eq!(fetcher.fetch(&url).await, listing);
    Ok(())
}

#[tokio::test]
async fn test_single_fetch_forbidden_returns_empty_record()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let reporter = RecordingReporter::shared();
    let record = single_fetcher(&reporter).fetch(&mock_server.uri()).await;

    assert_eq!(record, json!({}));
    assert_eq!(reporter.retry_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_single_fetch_resends_request_on_each_attempt()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(FlakyResponder {
            calls: AtomicUsize::new(0),
            failures: 1,
            body: json!({"results": []}),
        })
        .expect(2)
        .mount(&mock_server)
        .await;

    let reporter = RecordingReporter::shared();
    let outcome = single_fetcher(&reporter)
        .fetch_outcome(&mock_server.uri())
        .await;

    assert_eq!(outcome, FetchOutcome::Success(json!({"results": []})));
    // Remaining-budget schedule: one step after the first failure.
    assert_eq!(reporter.retry_delays(&mock_server.uri()), vec![STEP]);
    Ok(())
}

#[tokio::test]
async fn test_single_fetch_larger_budget_never_retries_without_waiting()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(8)
        .mount(&mock_server)
        .await;

    let reporter = RecordingReporter::shared();
    let fetcher = SingleFetcher::new(
        RetryPolicy::single().with_step(STEP).with_max_attempts(8),
        ClientSettings::default(),
        Arc::clone(&reporter) as _,
    );

    assert_eq!(fetcher.fetch(&mock_server.uri()).await, json!({}));
    let expected: Vec<Duration> = (1..8).map(|n| STEP * n).collect();
    assert_eq!(reporter.retry_delays(&mock_server.uri()), expected);
    Ok(())
}

// ==================== End-to-End Scenario ====================

#[tokio::test]
async fn test_detail_batch_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    let detail = json!({"Detail URL": "http://x/1", "title": "Foo"});
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail.clone()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let base = mock_server.uri();
    let reporter = RecordingReporter::shared();
    let results = concurrent_fetcher(2, &reporter)?
        .fetch_urls(&[format!("{base}/a"), format!("{base}/b")])
        .await;

    let elapsed = results.elapsed();
    assert!(elapsed < Duration::from_secs(60));
    assert_eq!(results.into_records(), vec![detail, json!({})]);
    Ok(())
}
