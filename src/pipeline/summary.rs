//! The `esummary` call: fetches document summaries for a resolved search,
//! either in one request or paged across several concurrent batches.

use crate::batch::{Batch, BatchInfo};
use crate::error::PipelineError;
use crate::http::{retry, Client, RetryConfig};
use crate::pipeline::orchestrator::EntrezParams;
use crate::pipeline::search::{push_credentials, urlencode};
use crate::rate_limiter::RateLimiter;
use crate::types::QueryResult;
use crate::wire::ESummaryResult;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

fn build_url(params: &EntrezParams, web_env: &str, query_key: &str, retstart: u64, retmax: u64) -> String {
    let mut fields = vec![
        ("db", params.db.clone()),
        ("WebEnv", web_env.to_string()),
        ("query_key", query_key.to_string()),
        ("retstart", retstart.to_string()),
        ("retmax", retmax.to_string()),
        ("retmode", params.ret_mode.clone()),
    ];
    push_credentials(&mut fields, params);
    format!(
        "{}/esummary.fcgi?{}",
        params.base_url,
        fields.iter().map(|(k, v)| format!("{k}={}", urlencode(v))).collect::<Vec<_>>().join("&")
    )
}

async fn execute_summary(
    client: &Client,
    rate_limiter: &RateLimiter,
    retry_config: &RetryConfig,
    cancel: &CancellationToken,
    params: &EntrezParams,
    web_env: &str,
    query_key: &str,
    retstart: u64,
    retmax: u64,
) -> Result<ESummaryResult, PipelineError> {
    retry::retry("esummary", retry_config, cancel, || async {
        rate_limiter.wait().await;
        let url = build_url(params, web_env, query_key, retstart, retmax);
        let body = client.execute_buffered(client.get(&url)).await?;
        let result: ESummaryResult = quick_xml::de::from_str(&body)?;
        if result.document_summary_set.document_summary.is_empty() {
            return Err(PipelineError::empty_result("empty document summary set"));
        }
        Ok(result)
    })
    .await
}

/// Fetches every record in one request. Used when the result set fits
/// within a single batch.
///
/// # Errors
///
/// Returns an error if the request fails after retries.
pub async fn execute_single_summary(
    client: &Client,
    rate_limiter: &RateLimiter,
    retry_config: &RetryConfig,
    cancel: &CancellationToken,
    params: &EntrezParams,
    web_env: &str,
    query_key: &str,
    total_count: u64,
) -> Result<ESummaryResult, PipelineError> {
    execute_summary(client, rate_limiter, retry_config, cancel, params, web_env, query_key, 0, total_count).await
}

/// Fetches every batch of a result set concurrently (bounded by
/// `max_workers`), recording per-batch failures on `collector` instead of
/// failing the whole query — a batch that never succeeds after retries
/// just shrinks the final record count and is retried on a future run.
///
/// # Errors
///
/// Returns an error only if every batch fails; a partial result is
/// returned as `Ok` with `collector.failed_batches` populated.
pub async fn execute_summary_batches(
    client: &Client,
    rate_limiter: &RateLimiter,
    retry_config: &RetryConfig,
    cancel: &CancellationToken,
    params: &EntrezParams,
    web_env: &str,
    query_key: &str,
    batches: &[BatchInfo],
    max_workers: usize,
    collector: &mut QueryResult,
) -> ESummaryResult {
    run_batches(client, rate_limiter, retry_config, cancel, params, web_env, query_key, batches, max_workers, collector)
        .await
}

#[allow(clippy::too_many_arguments)]
async fn run_batches(
    client: &Client,
    rate_limiter: &RateLimiter,
    retry_config: &RetryConfig,
    cancel: &CancellationToken,
    params: &EntrezParams,
    web_env: &str,
    query_key: &str,
    batches: &[BatchInfo],
    max_workers: usize,
    collector: &mut QueryResult,
) -> ESummaryResult {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let (tx, mut rx) = tokio::sync::mpsc::channel(batches.len().max(1));

    for &batch in batches {
        let client = client.clone();
        let rate_limiter = rate_limiter.clone();
        let retry_config = *retry_config;
        let cancel = cancel.clone();
        let params = params.clone();
        let web_env = web_env.to_string();
        let query_key = query_key.to_string();
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(_) => return,
            };

            let result = execute_summary(
                &client,
                &rate_limiter,
                &retry_config,
                &cancel,
                &params,
                &web_env,
                &query_key,
                batch.start,
                batch.size,
            )
            .await;

            let _ = tx.send((batch, result)).await;
        });
    }
    drop(tx);

    let mut combined = ESummaryResult::default();
    while let Some((batch, result)) = rx.recv().await {
        match result {
            Ok(summary) => {
                let count = summary.document_summary_set.document_summary.len() as u64;
                combined.document_summary_set.document_summary.extend(summary.document_summary_set.document_summary);
                collector.add_processed_records(count);
                collector.remove_failed_batch(batch.start);
            }
            Err(err) => {
                collector.add_failed_batch(BatchInfo { batch_num: batch.batch_num, start: batch.start, size: batch.size });
                tracing::warn!(batch_num = batch.batch_num, start = batch.start, error = %err, "batch failed");
            }
        }
    }

    combined
}

/// Splits `total_count` into batches of `batch_size` and runs them all via
/// [`execute_summary_batches`], recording the partition on `collector`.
///
/// # Errors
///
/// Never returns an error directly; failures are recorded as failed
/// batches on `collector`.
pub async fn process_summary_flow(
    client: &Client,
    rate_limiter: &RateLimiter,
    retry_config: &RetryConfig,
    cancel: &CancellationToken,
    params: &EntrezParams,
    web_env: &str,
    query_key: &str,
    total_count: u64,
    batch_size: u64,
    max_workers: usize,
    collector: &mut QueryResult,
) -> Result<ESummaryResult, PipelineError> {
    if total_count <= batch_size {
        collector.set_total_batches(1);
        let result =
            execute_single_summary(client, rate_limiter, retry_config, cancel, params, web_env, query_key, total_count)
                .await?;
        collector.add_processed_records(result.document_summary_set.document_summary.len() as u64);
        return Ok(result);
    }

    let batch = Batch::new(total_count, batch_size);
    collector.set_total_batches(batch.batches);
    let max_workers = crate::config::validator::worker_count(max_workers, batch.batches);
    let result = execute_summary_batches(
        client, rate_limiter, retry_config, cancel, params, web_env, query_key, &batch.batch_infos, max_workers, collector,
    )
    .await;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_carries_history_handle_and_paging_params() {
        let params = EntrezParams {
            base_url: "https://example.test/entrez".to_string(),
            db: "clinvar".to_string(),
            use_history: true,
            email: String::new(),
            tool_name: String::new(),
            api_key: String::new(),
            ret_max: 10_000,
            ret_mode: "xml".to_string(),
        };
        let url = build_url(&params, "NCID_1", "1", 1000, 500);
        assert!(url.contains("WebEnv=NCID_1"));
        assert!(url.contains("query_key=1"));
        assert!(url.contains("retstart=1000"));
        assert!(url.contains("retmax=500"));
        assert!(url.contains("retmode=xml"));
    }
}
