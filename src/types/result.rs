//! Per-query outcome: progress counters, failed-batch ledger, and the
//! collected summary documents.

use crate::batch::BatchInfo;
use crate::wire::ESummaryResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse outcome for a query, derived from its progress percentage:
/// 0% is `Failed`, 100% is `Success`, anything in between is `Partial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Success,
    Partial,
    Failed,
}

/// State accumulated while a single query runs, and persisted to the cache
/// once it settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub query_id: String,
    pub query: String,
    pub total_records: u64,
    pub processed_count: u64,
    pub status: QueryStatus,
    pub failed_batches: Vec<BatchInfo>,
    pub total_batches: usize,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: f64,
    pub progress: f64,
    pub result: Option<ESummaryResult>,
    /// Whether the filter set in effect when this result was cached matches
    /// the filter set in effect now; a mismatch invalidates the cache entry.
    pub last_query_has_filters: bool,
}

impl QueryResult {
    #[must_use]
    pub fn new(query_id: impl Into<String>, query: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            query_id: query_id.into(),
            query: query.into(),
            total_records: 0,
            processed_count: 0,
            status: QueryStatus::Failed,
            failed_batches: Vec::new(),
            total_batches: 0,
            error: None,
            created_at: now,
            end_time: None,
            duration_secs: 0.0,
            progress: 0.0,
            result: None,
            last_query_has_filters: false,
        }
    }

    pub fn set_total_records(&mut self, total: u64) {
        self.total_records = total;
    }

    pub fn set_total_batches(&mut self, total: usize) {
        self.total_batches = total;
    }

    pub fn add_processed_records(&mut self, count: u64) {
        self.processed_count += count;
    }

    /// Records a batch failure, replacing any existing entry for the same
    /// start offset so retries don't accumulate duplicate ledger rows.
    pub fn add_failed_batch(&mut self, batch: BatchInfo) {
        self.failed_batches.retain(|b| b.start != batch.start);
        self.failed_batches.push(batch);
    }

    pub fn remove_failed_batch(&mut self, start: u64) {
        self.failed_batches.retain(|b| b.start != start);
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_records == self.processed_count
    }

    /// Progress as a fraction in `[0.0, 100.0]`. Zero whenever nothing has
    /// been processed yet or the total is unknown, to avoid a spurious
    /// division by zero before `set_total_records` has run.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.processed_count == 0 || self.total_records == 0 {
            return 0.0;
        }
        if self.processed_count >= self.total_records {
            return 100.0;
        }
        (self.processed_count as f64 / self.total_records as f64) * 100.0
    }

    #[must_use]
    pub fn progress_string(&self) -> String {
        format!("{:.2}%", self.progress_percent())
    }

    #[must_use]
    pub fn query_status(&self) -> QueryStatus {
        let progress = self.progress_percent();
        if progress <= 0.0 {
            QueryStatus::Failed
        } else if progress >= 100.0 {
            QueryStatus::Success
        } else {
            QueryStatus::Partial
        }
    }

    /// Recomputes `end_time`, `duration_secs`, `progress` and `status` from
    /// the current counters. Called once a query's pipeline run (or cache
    /// resume) has settled.
    pub fn update_basic_status(&mut self, now: DateTime<Utc>, has_filters: bool) {
        self.end_time = Some(now);
        self.duration_secs = (now - self.created_at).num_milliseconds() as f64 / 1000.0;
        self.progress = self.progress_percent();
        self.last_query_has_filters = has_filters;
        self.status = self.query_status();
    }

    /// Marks the query as a total failure: resets progress, clears any
    /// partial result, and records the terminating error.
    pub fn set_status_on_error(&mut self, now: DateTime<Utc>, error: impl Into<String>) {
        self.processed_count = 0;
        self.status = QueryStatus::Failed;
        self.error = Some(error.into());
        self.result = None;
        self.end_time = Some(now);
        self.duration_secs = (now - self.created_at).num_milliseconds() as f64 / 1000.0;
        self.progress = 0.0;
    }
}
