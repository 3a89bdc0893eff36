//! The `esearch` call: resolves a query term to a record count and, with
//! `use_history` enabled, a `WebEnv`/`QueryKey` handle for paging summaries.

use crate::error::PipelineError;
use crate::http::{retry, Client, RetryConfig};
use crate::pipeline::orchestrator::EntrezParams;
use crate::rate_limiter::RateLimiter;
use crate::wire::ESearchResult;
use tokio_util::sync::CancellationToken;

/// Above this URL length, `esearch` is issued as a POST with a form body
/// instead of a GET with a query string, to stay clear of server/proxy URL
/// length limits on long filter-combined terms.
const MAX_GET_URL_LEN: usize = 2048;

/// Runs one `esearch` request, retrying transient failures. An empty result
/// set is treated as retryable (mirrors a search landing between upstream
/// index updates) up to the retry budget, then surfaced as
/// [`PipelineError::EmptyResult`].
///
/// # Errors
///
/// Returns an error if every retry attempt fails, or the last attempt's
/// error was not retryable.
pub async fn execute_search(
    client: &Client,
    rate_limiter: &RateLimiter,
    retry_config: &RetryConfig,
    cancel: &CancellationToken,
    params: &EntrezParams,
    term: &str,
) -> Result<ESearchResult, PipelineError> {
    retry::retry("esearch", retry_config, cancel, || async {
        rate_limiter.wait().await;
        let body = send_search_request(client, params, term).await?;
        let result: ESearchResult = quick_xml::de::from_str(&body)?;
        if result.count == 0 {
            return Err(PipelineError::empty_result(format!("no records for term {term:?}")));
        }
        Ok(result)
    })
    .await
}

/// Combines a query's raw content with the active filter expression, per
/// the term-building rule: `((content) AND filters)` when filters are
/// active, else just `(content)`.
#[must_use]
pub fn combine_term(content: &str, filters_expr: &str) -> String {
    if filters_expr.is_empty() {
        format!("({content})")
    } else {
        format!("(({content}) AND {filters_expr})")
    }
}

async fn send_search_request(client: &Client, params: &EntrezParams, term: &str) -> Result<String, PipelineError> {
    let fields = search_fields(params, term);
    let url = format!("{}/esearch.fcgi", params.base_url);
    let query_url = format!("{url}?{}", encode_fields(&fields));

    if query_url.len() > MAX_GET_URL_LEN {
        client.execute_buffered(client.post(&url).form(&fields)).await
    } else {
        client.execute_buffered(client.get(&query_url)).await
    }
}

fn search_fields(params: &EntrezParams, term: &str) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("db", params.db.clone()),
        ("term", term.to_string()),
        ("retmode", params.ret_mode.clone()),
        ("retmax", params.ret_max.to_string()),
        ("usehistory", if params.use_history { "y" } else { "n" }.to_string()),
    ];
    push_credentials(&mut fields, params);
    fields
}

pub(super) fn push_credentials(fields: &mut Vec<(&'static str, String)>, params: &EntrezParams) {
    if !params.tool_name.is_empty() {
        fields.push(("tool", params.tool_name.clone()));
    }
    if !params.email.is_empty() {
        fields.push(("email", params.email.clone()));
    }
    if !params.api_key.is_empty() {
        fields.push(("api_key", params.api_key.clone()));
    }
}

pub(super) fn encode_fields(fields: &[(&'static str, String)]) -> String {
    fields.iter().map(|(k, v)| format!("{k}={}", urlencode(v))).collect::<Vec<_>>().join("&")
}

pub(super) fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
