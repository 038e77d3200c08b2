//! Integration tests for the extraction pipeline against a mock dataset.

use std::sync::Arc;
use std::time::Duration;

use filmfetch_core::fetch::ClientSettings;
use filmfetch_core::pipeline::{Pipeline, PipelineError, PipelineOptions};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

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

fn options_for(server: &MockServer, output: &TempDir) -> PipelineOptions {
    PipelineOptions {
        base_url: format!("{}/", server.uri()),
        output_dir: output.path().to_path_buf(),
        concurrency: 4,
        max_attempts: 2,
        client: ClientSettings::with_timeouts(5, 5),
        clean: true,
    }
}

async fn mount_dataset(server: &MockServer) {
    let base = server.uri();
    let listing = json!({
        "results": [
            {"year": "1927 / 28 (1st)", "films": [
                {"Film": "Wings", "Wiki URL": "http://en.wikipedia.org/wiki/Wings", "Winner": true, "Detail URL": format!("{base}/films/wings")},
                {"Film": "7th Heaven", "Wiki URL": "http://en.wikipedia.org/wiki/7th_Heaven", "Winner": false, "Detail URL": format!("{base}/films/heaven")}
            ]},
            {"year": "1929 (2nd)", "films": [
                {"Film": "Alibi, The", "Winner": false, "Detail URL": format!("{base}/films/alibi")}
            ]}
        ]
    });

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/films/wings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"Budget": "$2 million", "Running time": "144 minutes"}))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/films/heaven"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Budget": "£100,000"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/films/alibi"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pipeline_writes_raw_and_stage_tables() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    mount_dataset(&mock_server).await;
    let output = TempDir::new()?;
    let reporter = RecordingReporter::shared();

    let pipeline = Pipeline::new(options_for(&mock_server, &output), Arc::clone(&reporter) as _);
    let report = pipeline.run().await?;

    assert_eq!(report.films, 3);
    assert_eq!(report.batch.succeeded, 2);
    assert_eq!(report.batch.forbidden, 1);
    assert_eq!(report.batch.exhausted, 0);

    let base = mock_server.uri();
    let raw = std::fs::read_to_string(&report.raw_path)?;
    let expected_raw = format!(
        "film,year,wiki_url,winner,detail_url,budget\n\
         Wings,1927 / 28 (1st),http://en.wikipedia.org/wiki/Wings,True,{base}/films/wings,$2 million\n\
         7th Heaven,1927 / 28 (1st),http://en.wikipedia.org/wiki/7th_Heaven,False,{base}/films/heaven,\"£100,000\"\n\
         \"Alibi, The\",1929 (2nd),,False,{base}/films/alibi,\n"
    );
    assert_eq!(raw, expected_raw);

    let stage_path = report.stage_path.expect("cleaning enabled");
    let stage = std::fs::read_to_string(stage_path)?;
    let lines: Vec<&str> = stage.lines().collect();
    assert_eq!(
        lines[0],
        "film,year,wiki_url,winner,detail_url,budget,budget_usd"
    );
    assert!(lines[1].starts_with("Wings,1927,"), "got {}", lines[1]);
    assert!(lines[1].ends_with(",2000000.0"), "got {}", lines[1]);
    assert!(lines[2].starts_with("7th Heaven,1927,"), "got {}", lines[2]);
    assert!(lines[3].ends_with(",0.0"), "got {}", lines[3]);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_skip_clean_writes_only_raw_table()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    mount_dataset(&mock_server).await;
    let output = TempDir::new()?;

    let options = PipelineOptions {
        clean: false,
        ..options_for(&mock_server, &output)
    };
    let report = Pipeline::new(options, RecordingReporter::shared())
        .run()
        .await?;

    assert!(report.stage_path.is_none());
    assert!(report.raw_path.exists());
    assert!(!output.path().join("stage_films_data.csv").exists());
    Ok(())
}

#[tokio::test]
async fn test_forbidden_listing_is_malformed() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;
    let output = TempDir::new()?;

    let err = Pipeline::new(
        options_for(&mock_server, &output),
        RecordingReporter::shared(),
    )
    .run()
    .await
    .expect_err("an empty listing cannot be exploded");

    assert!(matches!(err, PipelineError::MalformedListing { .. }));
    assert!(!output.path().join("raw_films_data.csv").exists());
    Ok(())
}

#[tokio::test]
async fn test_extract_keeps_listing_order() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = require_mock_server!();
    mount_dataset(&mock_server).await;
    let output = TempDir::new()?;

    let extraction = Pipeline::new(
        options_for(&mock_server, &output),
        RecordingReporter::shared(),
    )
    .extract()
    .await?;

    let films: Vec<_> = extraction
        .records
        .iter()
        .map(|r| r.film.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(films, vec!["Wings", "7th Heaven", "Alibi, The"]);
    assert_eq!(extraction.records[0].budget.as_deref(), Some("$2 million"));
    assert_eq!(extraction.records[2].budget, None);
    Ok(())
}
