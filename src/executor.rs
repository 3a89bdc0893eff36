//! Dispatches a list of queries across a worker pool, consulting the cache
//! before running the pipeline and updating run-wide [`Stats`] as each
//! query settles.

use crate::cache::FileCache;
use crate::config::validator::worker_count;
use crate::config::RuntimeConfig;
use crate::error::PipelineError;
use crate::pipeline::{EntrezParams, Pipeline};
use crate::pipeline::orchestrator::PipelineConfig;
use crate::query::Query;
use crate::types::result::QueryStatus;
use crate::types::{QueryResult, Stats};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs every query in `queries`, respecting `runtime.max_query_workers`
/// concurrency, and returns one [`QueryResult`] per query.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyResult`] if every query failed; otherwise
/// returns `Ok` even when some queries failed, since failures are recorded
/// per-result rather than aborting the run.
pub struct QueryExecutor {
    pipeline: Pipeline,
    cache: Option<FileCache>,
    entrez_params: EntrezParams,
    runtime: RuntimeConfig,
    has_filters: bool,
    filters_expr: String,
}

impl QueryExecutor {
    #[must_use]
    pub fn new(
        pipeline: Pipeline,
        cache: Option<FileCache>,
        entrez_params: EntrezParams,
        runtime: RuntimeConfig,
        filters_expr: String,
    ) -> Self {
        let has_filters = !filters_expr.is_empty();
        Self { pipeline, cache, entrez_params, runtime, has_filters, filters_expr }
    }

    pub async fn execute_queries(&self, queries: Vec<Query>) -> Result<Vec<QueryResult>, PipelineError> {
        let stats = Arc::new(Stats::new());
        stats.set_total_queries(queries.len());

        let worker_cap = worker_count(self.runtime.max_query_workers, queries.len());
        let semaphore = Arc::new(Semaphore::new(worker_cap));
        let (tx, mut rx) = tokio::sync::mpsc::channel(worker_count(self.runtime.buffer_size, queries.len().max(1)));

        let mut handles = Vec::with_capacity(queries.len());
        for query in queries {
            let semaphore = Arc::clone(&semaphore);
            let stats = Arc::clone(&stats);
            let tx = tx.clone();
            let this = self.clone_for_worker();
            let query_id = query.query_id();
            let content = query.content.clone();

            handles.push((
                query_id,
                content,
                tokio::spawn(async move {
                    let _permit = semaphore.acquire().await;
                    this.run_one_query(query, &stats, tx).await;
                }),
            ));
        }
        drop(tx);

        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }

        for (query_id, content, handle) in handles {
            if let Err(join_err) = handle.await {
                if join_err.is_panic() {
                    tracing::error!(error = %join_err, query_id = %query_id, "query worker panicked");
                    stats.add_failed_query(&query_id, "query worker panicked".to_string());
                    results.push(panicked_query_result(query_id, content));
                }
            }
        }

        stats.log_summary();

        if stats.all_queries_failed() {
            return Err(PipelineError::empty_result("all queries failed"));
        }

        Ok(results)
    }

    /// A cheap, `Clone`-free view used to move just what a spawned worker
    /// needs without cloning `self` as a whole (`QueryExecutor` owns a
    /// possibly-absent cache handle that's cheap to clone, but keeping the
    /// clone explicit documents that workers run fully independently).
    fn clone_for_worker(&self) -> WorkerContext {
        WorkerContext {
            pipeline: self.pipeline.clone(),
            cache: self.cache.clone(),
            entrez_params: self.entrez_params.clone(),
            runtime: self.runtime,
            has_filters: self.has_filters,
            filters_expr: self.filters_expr.clone(),
        }
    }
}

/// Synthesizes the `Failed` result recorded for a query whose worker panicked,
/// so the query still appears exactly once in the returned result set.
fn panicked_query_result(query_id: String, content: String) -> QueryResult {
    let now = Utc::now();
    let mut result = QueryResult::new(query_id, content, now);
    result.set_status_on_error(now, "query worker panicked");
    result
}

#[derive(Clone)]
struct WorkerContext {
    pipeline: Pipeline,
    cache: Option<FileCache>,
    entrez_params: EntrezParams,
    runtime: RuntimeConfig,
    has_filters: bool,
    filters_expr: String,
}

impl WorkerContext {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            batch_size: self.runtime.batch_size,
            max_esummary_workers: self.runtime.max_esummary_workers,
            single_query_timeout: self.runtime.single_query_timeout,
            filters_expr: self.filters_expr.clone(),
        }
    }

    async fn run_one_query(&self, query: Query, stats: &Stats, tx: tokio::sync::mpsc::Sender<QueryResult>) {
        if let Some(mut cached) = self.try_get_from_cache(&query).await {
            self.record_and_send(&mut cached, stats, tx).await;
            return;
        }

        let mut result = self.pipeline.execute_query(&self.entrez_params, &self.pipeline_config(), &query).await;
        result.last_query_has_filters = self.has_filters;

        if let Some(cache) = &self.cache {
            if result.result.is_some() {
                if let Err(err) = cache.set(&result.query_id, &result).await {
                    tracing::warn!(query_id = %result.query_id, error = %err, "failed to cache query result");
                }
            }
        }

        self.record_and_send(&mut result, stats, tx).await;
    }

    async fn try_get_from_cache(&self, query: &Query) -> Option<QueryResult> {
        let cache = self.cache.as_ref()?;
        let mut cached = cache.get(&query.query_id()).await?;

        if cached.last_query_has_filters != self.has_filters {
            return None;
        }

        if cached.is_complete() {
            return Some(cached);
        }

        self.pipeline.resume_from_cache(&self.entrez_params, &self.pipeline_config(), query, &mut cached).await;

        if let Some(cache) = &self.cache {
            if cached.status != QueryStatus::Failed {
                if let Err(err) = cache.set(&cached.query_id, &cached).await {
                    tracing::warn!(query_id = %cached.query_id, error = %err, "failed to update cache after resume");
                }
            }
        }

        Some(cached)
    }

    async fn record_and_send(&self, result: &mut QueryResult, stats: &Stats, tx: tokio::sync::mpsc::Sender<QueryResult>) {
        if result.status == QueryStatus::Success {
            stats.add_completed_query();
        } else if result.status == QueryStatus::Failed {
            stats.add_failed_query(result.query_id.as_str(), result.error.clone().unwrap_or_default());
        }

        stats.add_total_records(result.total_records);
        stats.add_processed_records(result.processed_count);

        if !result.failed_batches.is_empty() {
            stats.add_partial_failures(result.query_id.as_str(), result.failed_batches.clone());
        }

        let _ = tx.send(result.clone()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::client::ClientConfig;
    use crate::http::{Client, RetryConfig};
    use crate::rate_limiter::RateLimiter;
    use std::time::Duration;

    fn executor() -> QueryExecutor {
        let client = Client::new(ClientConfig::default()).unwrap();
        let pipeline = Pipeline::new(client, RateLimiter::with_rate(100), RetryConfig {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            multiplier: 1.0,
            randomization_factor: 0.0,
        });
        let params = EntrezParams {
            base_url: "http://127.0.0.1:1".to_string(),
            db: "clinvar".to_string(),
            use_history: true,
            email: String::new(),
            tool_name: "clinvar-dl".to_string(),
            api_key: String::new(),
            ret_max: 10_000,
            ret_mode: "xml".to_string(),
        };
        let mut runtime = RuntimeConfig::new(false);
        runtime.single_query_timeout = Duration::from_millis(200);
        QueryExecutor::new(pipeline, None, params, runtime, String::new())
    }

    #[tokio::test]
    async fn all_queries_failing_surfaces_as_empty_result_error() {
        let executor = executor();
        let err = executor.execute_queries(vec![Query::new("BRCA1[gene]")]).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyResult(_)));
    }

    #[test]
    fn panicked_query_result_is_recorded_as_failed() {
        let result = panicked_query_result("BRCA1-abc123".to_string(), "BRCA1[gene]".to_string());
        assert_eq!(result.status, QueryStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("query worker panicked"));
        assert_eq!(result.processed_count, 0);
    }

    #[tokio::test]
    async fn a_panicking_worker_still_yields_a_failed_result_for_its_query() {
        let semaphore = Arc::new(Semaphore::new(1));
        let query_id = "TP53-def456".to_string();
        let content = "TP53[gene]".to_string();
        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire().await;
            panic!("simulated worker panic");
        });

        let join_err = handle.await.unwrap_err();
        assert!(join_err.is_panic());
        let failed = panicked_query_result(query_id.clone(), content);
        assert_eq!(failed.query_id, query_id);
        assert_eq!(failed.status, QueryStatus::Failed);
    }
}
