//! Integration tests for Scholar Pubs
//!
//! These tests drive the full pipeline through the public API: a source, the
//! parser, normalization, dedup, sorting and the JSON file sink.

use scholar_pubs::config::{load_config, Config, FatalPolicy};
use scholar_pubs::models::{AcquisitionResult, PublicationList};
use scholar_pubs::pipeline::Pipeline;
use scholar_pubs::sink::JsonFileSink;
use scholar_pubs::sources::{connect_source, MockSource, SourceKind};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::tempdir;

fn config() -> Config {
    let mut config = Config::default();
    config.profile.author_id = "AUTHOR".to_string();
    config
}

fn read_json(path: &Path) -> Value {
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

async fn run_mock(source: MockSource, config: &Config, output: &Path) -> scholar_pubs::RunReport {
    let sink = JsonFileSink::new(output);
    let mut pipeline = Pipeline::from_config(Box::new(source), config).unwrap();
    pipeline
        .run_to_sink(&sink, config.output.on_fatal)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_structured_unit_end_to_end() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("publications.json");
    let source = MockSource::new().with_listing(AcquisitionResult::Structured(vec![json!({
        "title": "X",
        "author": "A and B",
        "venue": "Conf, 2021",
        "year": "2021"
    })]));

    run_mock(source, &config(), &output).await;

    assert_eq!(
        read_json(&output),
        json!({"items": [{"title": "X", "authors": ["A", "B"], "venue": "Conf", "year": "2021", "abstract": ""}]})
    );
}

#[tokio::test]
async fn test_zero_items_writes_empty_document() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("publications.json");

    let report = run_mock(MockSource::new(), &config(), &output).await;

    assert_eq!(report.raw_units, 0);
    assert_eq!(read_json(&output), json!({"items": []}));
}

#[tokio::test]
async fn test_sort_is_stable_and_unknown_years_last() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("publications.json");
    let source = MockSource::new().with_listing(AcquisitionResult::Structured(vec![
        json!({"title": "Undated"}),
        json!({"title": "Older", "year": "2018"}),
        json!({"title": "Same year first", "pub_year": 2020}),
        json!({"title": "Newest", "publication_date": "2022/3/1"}),
        json!({"title": "Same year second", "year": "2020"}),
    ]));

    let report = run_mock(source, &config(), &output).await;

    let titles: Vec<&str> = report.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Newest", "Same year first", "Same year second", "Older", "Undated"]
    );

    let written: PublicationList = serde_json::from_value(read_json(&output)).unwrap();
    assert_eq!(written.items, report.records);
}

#[tokio::test]
async fn test_unknown_years_first_when_configured() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("publications.json");
    let mut config = config();
    config.normalize.unknown_year = scholar_pubs::utils::UnknownYear::First;

    let source = MockSource::new().with_listing(AcquisitionResult::Structured(vec![
        json!({"title": "Dated", "year": "2019"}),
        json!({"title": "Zeroed", "year": "0000"}),
    ]));

    let report = run_mock(source, &config, &output).await;
    assert_eq!(report.records[0].title, "Zeroed");
}

#[tokio::test]
async fn test_output_never_exceeds_input() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("publications.json");
    let listing = AcquisitionResult::Markup(vec![
        r#"<tr class="gsc_a_tr"><td class="gsc_a_t"><a class="gsc_a_at">Row one</a><div class="gs_gray">A, B</div><div class="gs_gray">Venue, 2020</div></td><td class="gsc_a_y"><span class="gsc_a_h">2020</span></td></tr>"#.to_string(),
        r#"<div>Please show you're not a robot</div>"#.to_string(),
        r#"<tr class="gsc_a_tr"><td class="gsc_a_t"><a class="gsc_a_at">Row one</a></td><td class="gsc_a_y"><span class="gsc_a_h">2020</span></td></tr>"#.to_string(),
        r#"<tr class="gsc_a_tr"><td class="gsc_a_t"><a class="gsc_a_at">Row three</a></td></tr>"#.to_string(),
    ]);
    let source = MockSource::new().with_listing(listing);

    let report = run_mock(source, &config(), &output).await;

    assert_eq!(report.raw_units, 4);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.duplicates_removed, 1);
    assert!(report.records.len() <= report.raw_units);
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].authors, vec!["A", "B"]);
    assert_eq!(report.records[0].venue, "Venue");
}

#[tokio::test]
async fn test_fatal_failure_with_empty_policy() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("publications.json");
    let sink = JsonFileSink::new(&output);
    let source = MockSource::new().failing_listing("author lookup exhausted retries");

    let mut pipeline = Pipeline::from_config(Box::new(source), &config()).unwrap();
    let result = pipeline.run_to_sink(&sink, FatalPolicy::Empty).await;

    assert!(result.is_err());
    assert_eq!(read_json(&output), json!({"items": []}));
}

#[tokio::test]
async fn test_fatal_failure_with_skip_policy_writes_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("publications.json");
    let sink = JsonFileSink::new(&output);
    let source = MockSource::new().failing_listing("author lookup exhausted retries");

    let mut pipeline = Pipeline::from_config(Box::new(source), &config()).unwrap();
    assert!(pipeline.run_to_sink(&sink, FatalPolicy::Skip).await.is_err());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_citations_included_on_request() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("publications.json");
    let mut config = config();
    config.acquisition.include_citations = true;

    let source = MockSource::new().with_listing(AcquisitionResult::Structured(vec![json!({
        "title": "Cited", "year": "2020", "cited_by": {"value": 17}
    })]));

    run_mock(source, &config, &output).await;
    assert_eq!(read_json(&output)["items"][0]["citations"], 17);
}

#[tokio::test]
async fn test_profile_pages_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let _listing = server
        .mock("GET", "/citations")
        .match_query(mockito::Matcher::UrlEncoded("cstart".into(), "0".into()))
        .with_status(200)
        .with_body(
            r#"<html><body><table><tbody id="gsc_a_b">
            <tr class="gsc_a_tr"><td class="gsc_a_t"><a href="/citations?view_op=view_citation&amp;citation_for_view=A:1" class="gsc_a_at">Older paper</a><div class="gs_gray">C Lee</div><div class="gs_gray">Workshop, 2017</div></td><td class="gsc_a_y"><span class="gsc_a_h">2017</span></td></tr>
            <tr class="gsc_a_tr"><td class="gsc_a_t"><a href="/citations?view_op=view_citation&amp;citation_for_view=A:2" class="gsc_a_at">Newer paper</a><div class="gs_gray">A Smith, B Jones</div><div class="gs_gray">Journal&nbsp;of Things 4, 2021</div></td><td class="gsc_a_y"><span class="gsc_a_h">2021</span></td></tr>
            </tbody></table></body></html>"#,
        )
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let output = dir.path().join("publications.json");
    let mut config = config();
    config.acquisition.mode = SourceKind::Html;
    config.profile.base_url = server.url();
    config.retry.delay_ms = 1;

    let source = connect_source(&config).await.unwrap();
    let sink = JsonFileSink::new(&output);
    let mut pipeline = Pipeline::from_config(source, &config).unwrap();
    pipeline.run_to_sink(&sink, FatalPolicy::Skip).await.unwrap();
    pipeline.shutdown().await;

    assert_eq!(
        read_json(&output),
        json!({"items": [
            {"title": "Newer paper", "authors": ["A Smith", "B Jones"], "venue": "Journal of Things 4", "year": "2021", "abstract": ""},
            {"title": "Older paper", "authors": ["C Lee"], "venue": "Workshop", "year": "2017", "abstract": ""}
        ]})
    );
}

#[tokio::test]
async fn test_shutdown_reaches_source() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("publications.json");
    let source = MockSource::new();
    let shutdown_calls = source.shutdown_calls();

    let sink = JsonFileSink::new(&output);
    let mut pipeline = Pipeline::from_config(Box::new(source), &config()).unwrap();
    pipeline.run_to_sink(&sink, FatalPolicy::Skip).await.unwrap();
    assert_eq!(*shutdown_calls.lock().unwrap(), 0);

    pipeline.shutdown().await;
    assert_eq!(*shutdown_calls.lock().unwrap(), 1);
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scholar-pubs.toml");
    std::fs::write(
        &path,
        r#"
[profile]
author_id = "FILEID"

[acquisition]
mode = "browser"
fetch_abstracts = true

[normalize]
author_split = "and_only"

[output]
on_fatal = "empty"
"#,
    )
    .unwrap();

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.profile.author_id, "FILEID");
    assert_eq!(config.acquisition.mode, SourceKind::Browser);
    assert!(config.acquisition.fetch_abstracts);
    assert_eq!(config.output.on_fatal, FatalPolicy::Empty);
    assert_eq!(config.retry.max_attempts, 3);
    assert!(config.validate().is_ok());
}
