//! Ties the search and summary stages together for one query: `run_query`
//! awaits the `esearch` call, and only on a successful, history-bearing
//! result does it hand the `WebEnv`/`QueryKey` pair on to the `esummary`
//! stage. A search failure short-circuits the summary stage entirely —
//! there's nothing to page through without a resolved term — and is
//! recorded directly on the collector as the query's terminating error.

use crate::batch::BatchInfo;
use crate::config::validator::worker_count;
use crate::error::PipelineError;
use crate::http::{Client, RetryConfig};
use crate::pipeline::{search, summary};
use crate::query::Query;
use crate::rate_limiter::RateLimiter;
use crate::types::QueryResult;
use crate::wire::ESearchResult;
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Entrez connection details common to every request in a query's pipeline run.
#[derive(Debug, Clone)]
pub struct EntrezParams {
    pub base_url: String,
    pub db: String,
    pub use_history: bool,
    pub email: String,
    pub tool_name: String,
    pub api_key: String,
    /// Shared `retmax`/`retmode` parameters sent on the search request.
    /// Summary requests set their own `retmax` per batch but reuse `ret_mode`.
    pub ret_max: u64,
    pub ret_mode: String,
}

/// Per-run configuration the orchestrator needs beyond connection details.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub batch_size: u64,
    pub max_esummary_workers: usize,
    pub single_query_timeout: Duration,
    /// Server-side filter expression built from the active filter file, or
    /// empty if no filters are active. ANDed onto every query's content.
    pub filters_expr: String,
}

#[derive(Clone)]
pub struct Pipeline {
    client: Client,
    rate_limiter: RateLimiter,
    retry_config: RetryConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(client: Client, rate_limiter: RateLimiter, retry_config: RetryConfig) -> Self {
        Self { client, rate_limiter, retry_config }
    }

    /// Runs one query end to end: search, then summary, under the
    /// configured single-query timeout. Returns a [`QueryResult`] whose
    /// `status` reflects how much of the result set was actually fetched —
    /// a timeout or search failure is a total failure, but a batch that
    /// failed partway through summary fetching still yields a `Partial`
    /// result rather than propagating an error.
    pub async fn execute_query(&self, params: &EntrezParams, config: &PipelineConfig, query: &Query) -> QueryResult {
        let now = Utc::now();
        let mut collector = QueryResult::new(query.query_id(), query.content.clone(), now);
        let cancel = CancellationToken::new();

        let run = self.run_query(params, config, query, &cancel, &mut collector);

        match tokio::time::timeout(config.single_query_timeout, run).await {
            Ok(()) => {}
            Err(_) => {
                cancel.cancel();
                collector.set_status_on_error(Utc::now(), "query timed out");
            }
        }

        collector
    }

    async fn run_query(
        &self,
        params: &EntrezParams,
        config: &PipelineConfig,
        query: &Query,
        cancel: &CancellationToken,
        collector: &mut QueryResult,
    ) {
        let term = search::combine_term(&query.content, &config.filters_expr);
        let search_result = search::execute_search(
            &self.client,
            &self.rate_limiter,
            &self.retry_config,
            cancel,
            params,
            &term,
        )
        .await;

        let search_result = match search_result {
            Ok(result) => result,
            Err(err) => {
                collector.set_status_on_error(Utc::now(), err.to_string());
                return;
            }
        };

        collector.set_total_records(search_result.count);
        self.run_summary(params, config, &search_result, cancel, collector).await;
    }

    async fn run_summary(
        &self,
        params: &EntrezParams,
        config: &PipelineConfig,
        search_result: &ESearchResult,
        cancel: &CancellationToken,
        collector: &mut QueryResult,
    ) {
        if !search_result.has_history() {
            collector.set_status_on_error(Utc::now(), "search response carried no history handle");
            return;
        }

        let outcome = summary::process_summary_flow(
            &self.client,
            &self.rate_limiter,
            &self.retry_config,
            cancel,
            params,
            &search_result.web_env,
            &search_result.query_key,
            search_result.count,
            config.batch_size,
            config.max_esummary_workers,
            collector,
        )
        .await;

        match outcome {
            Ok(result) => {
                collector.result = Some(result);
                collector.error = None;
                collector.update_basic_status(Utc::now(), false);
            }
            Err(err) => {
                collector.set_status_on_error(Utc::now(), err.to_string());
            }
        }
    }

    /// Resumes a previously partial result by re-fetching only its
    /// recorded failed batches, appending any newly fetched documents onto
    /// the existing result rather than re-running the whole query.
    pub async fn retry_failed_batches(
        &self,
        params: &EntrezParams,
        config: &PipelineConfig,
        search_result: &ESearchResult,
        cached: &mut QueryResult,
    ) {
        let cancel = CancellationToken::new();
        let batches: Vec<BatchInfo> = cached.failed_batches.clone();
        if batches.is_empty() {
            return;
        }

        let max_workers = worker_count(config.max_esummary_workers, batches.len());
        let combined = summary::execute_summary_batches(
            &self.client,
            &self.rate_limiter,
            &self.retry_config,
            &cancel,
            params,
            &search_result.web_env,
            &search_result.query_key,
            &batches,
            max_workers,
            cached,
        )
        .await;

        match cached.result.as_mut() {
            Some(existing) => {
                existing.document_summary_set.document_summary.extend(combined.document_summary_set.document_summary);
            }
            None => cached.result = Some(combined),
        }

        cached.update_basic_status(Utc::now(), false);
    }

    /// Re-resolves `query` via a fresh `esearch` call (history tokens from
    /// the original run have long since expired) and retries only the
    /// batches recorded as failed on `cached`. Best-effort: if the fresh
    /// search itself fails, `cached` is left untouched so the caller still
    /// has the last good partial result.
    pub async fn resume_from_cache(&self, params: &EntrezParams, config: &PipelineConfig, query: &Query, cached: &mut QueryResult) {
        let cancel = CancellationToken::new();
        let term = search::combine_term(&query.content, &config.filters_expr);
        let search_result = search::execute_search(
            &self.client,
            &self.rate_limiter,
            &self.retry_config,
            &cancel,
            params,
            &term,
        )
        .await;

        let Ok(search_result) = search_result else { return };
        if !search_result.has_history() {
            return;
        }

        self.retry_failed_batches(params, config, &search_result, cached).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::client::ClientConfig;

    fn pipeline() -> Pipeline {
        let client = Client::new(ClientConfig::default()).unwrap();
        let rate_limiter = RateLimiter::with_rate(100);
        let retry_config = RetryConfig {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            multiplier: 1.0,
            randomization_factor: 0.0,
        };
        Pipeline::new(client, rate_limiter, retry_config)
    }

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

    #[tokio::test]
    async fn search_failure_yields_a_failed_query_result() {
        let pipeline = pipeline();
        let config = PipelineConfig {
            batch_size: 1000,
            max_esummary_workers: 1,
            single_query_timeout: Duration::from_secs(2),
            filters_expr: String::new(),
        };
        // Unroutable base URL: the transport error is classified as `Net`
        // and, being retryable, exhausts the single configured retry before
        // surfacing — exercising the same path a real upstream failure does.
        let result = pipeline
            .execute_query(&params("http://127.0.0.1:1".to_string()), &config, &Query::new("BRCA1[gene]"))
            .await;
        assert_eq!(result.status, crate::types::result::QueryStatus::Failed);
        assert!(result.error.is_some());
    }
}
