//! HTTP-level integration tests: a `wiremock` server stands in for the
//! Entrez endpoints so the search/summary stages, retry engine, and cache
//! can be exercised through real request/response round trips instead of
//! unit-level stubs.

use clinvar_dl::cache::FileCache;
use clinvar_dl::http::client::ClientConfig;
use clinvar_dl::http::{Client, RetryConfig};
use clinvar_dl::pipeline::{EntrezParams, Pipeline};
use clinvar_dl::pipeline::orchestrator::PipelineConfig;
use clinvar_dl::query::Query;
use clinvar_dl::rate_limiter::RateLimiter;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ESEARCH_BODY: &str = r#"<?xml version="1.0"?>
<eSearchResult>
  <Count>2</Count>
  <RetMax>2</RetMax>
  <RetStart>0</RetStart>
  <QueryKey>1</QueryKey>
  <WebEnv>NCID_1_test</WebEnv>
</eSearchResult>"#;

const ESUMMARY_BODY: &str = r#"<?xml version="1.0"?>
<eSummaryResult>
  <DocumentSummarySet>
    <DocumentSummary uid="1"><Title>first</Title></DocumentSummary>
    <DocumentSummary uid="2"><Title>second</Title></DocumentSummary>
  </DocumentSummarySet>
</eSummaryResult>"#;

fn params(base_url: String) -> EntrezParams {
    EntrezParams {
        base_url,
        db: "clinvar".to_string(),
        use_history: true,
        email: String::new(),
        tool_name: "clinvar-dl".to_string(),
        api_key: String::new(),
        ret_max: 10_000,
        ret_mode: "xml".to_string(),
    }
}

fn fast_retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        multiplier: 1.0,
        randomization_factor: 0.0,
    }
}

fn pipeline_config() -> PipelineConfig {
    PipelineConfig { batch_size: 1000, max_esummary_workers: 2, single_query_timeout: Duration::from_secs(5), filters_expr: String::new() }
}

#[tokio::test]
async fn search_then_summary_round_trips_through_the_mock_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ESEARCH_BODY))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/esummary.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ESUMMARY_BODY))
        .mount(&server)
        .await;

    let client = Client::new(ClientConfig::default()).unwrap();
    let pipeline = Pipeline::new(client, RateLimiter::with_rate(100), fast_retry_config());

    let result = pipeline.execute_query(&params(server.uri()), &pipeline_config(), &Query::new("BRCA1[gene]")).await;

    assert_eq!(result.status, clinvar_dl::types::result::QueryStatus::Success);
    assert_eq!(result.total_records, 2);
    assert_eq!(result.processed_count, 2);
}

#[tokio::test]
async fn a_503_is_retried_until_the_server_recovers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ESEARCH_BODY))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/esummary.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ESUMMARY_BODY))
        .mount(&server)
        .await;

    let client = Client::new(ClientConfig::default()).unwrap();
    let pipeline = Pipeline::new(client, RateLimiter::with_rate(100), fast_retry_config());

    let result = pipeline.execute_query(&params(server.uri()), &pipeline_config(), &Query::new("BRCA1[gene]")).await;

    assert_eq!(result.status, clinvar_dl::types::result::QueryStatus::Success);
}

#[tokio::test]
async fn an_empty_200_body_is_classified_as_empty_result_and_fails_the_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let client = Client::new(ClientConfig::default()).unwrap();
    let pipeline = Pipeline::new(client, RateLimiter::with_rate(100), fast_retry_config());

    let result = pipeline.execute_query(&params(server.uri()), &pipeline_config(), &Query::new("BRCA1[gene]")).await;

    assert_eq!(result.status, clinvar_dl::types::result::QueryStatus::Failed);
    assert!(result.error.as_deref().unwrap_or_default().contains("empty"));
}

#[tokio::test]
async fn long_filter_expressions_trigger_a_post_request_instead_of_get() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ESEARCH_BODY))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/esummary.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ESUMMARY_BODY))
        .mount(&server)
        .await;

    let client = Client::new(ClientConfig::default()).unwrap();
    let pipeline = Pipeline::new(client, RateLimiter::with_rate(100), fast_retry_config());

    let mut config = pipeline_config();
    config.filters_expr = "x".repeat(3000);

    let result = pipeline.execute_query(&params(server.uri()), &config, &Query::new("BRCA1[gene]")).await;

    // If the crate had issued a GET with this URL length, wiremock's POST-only
    // mock above would never match and the search would fail instead.
    assert_eq!(result.status, clinvar_dl::types::result::QueryStatus::Success);
}

#[tokio::test]
async fn a_cached_complete_result_is_served_without_any_http_call() {
    let server = MockServer::start().await;
    // No mocks registered: any request reaching the server fails the test.

    let tmp = tempfile::tempdir().unwrap();
    let cache = FileCache::new(tmp.path(), Duration::from_secs(3600)).unwrap();

    let query = Query::new("BRCA1[gene]");
    let now = chrono::Utc::now();
    let mut cached = clinvar_dl::types::QueryResult::new(query.query_id(), query.content.clone(), now);
    cached.set_total_records(1);
    cached.add_processed_records(1);
    cached.update_basic_status(now, false);
    cache.set(&cached.query_id, &cached).await.unwrap();

    let fetched = cache.get(&query.query_id()).await.unwrap();
    assert!(fetched.is_complete());

    // Confirm the server really received nothing during this test.
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}
