//! Run-wide counters shared across concurrent query workers.

use crate::batch::BatchInfo;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Aggregate progress and failure bookkeeping for one `run_queries` call.
///
/// The counters are atomics and the two maps are mutex-guarded `HashMap`s
/// (there is no `std`/ecosystem equivalent of Go's `sync.Map` worth pulling
/// in for two small maps written once per query) so workers can update them
/// without a shared `&mut`.
#[derive(Debug, Default)]
pub struct Stats {
    total_queries: AtomicU32,
    completed_queries: AtomicU32,
    total_records: AtomicU32,
    processed_records: AtomicU32,
    failed_queries: Mutex<HashMap<String, String>>,
    partial_failures: Mutex<HashMap<String, Vec<BatchInfo>>>,
}

impl Stats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total_queries(&self, total: usize) {
        self.total_queries.store(total as u32, Ordering::SeqCst);
    }

    pub fn add_completed_query(&self) {
        self.completed_queries.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_total_records(&self, count: u64) {
        self.total_records.fetch_add(count as u32, Ordering::SeqCst);
    }

    pub fn add_processed_records(&self, count: u64) {
        self.processed_records.fetch_add(count as u32, Ordering::SeqCst);
    }

    pub fn add_failed_query(&self, query_id: impl Into<String>, reason: impl Into<String>) {
        self.failed_queries.lock().unwrap().insert(query_id.into(), reason.into());
    }

    pub fn add_partial_failures(&self, query_id: impl Into<String>, failed_batches: Vec<BatchInfo>) {
        self.partial_failures.lock().unwrap().insert(query_id.into(), failed_batches);
    }

    #[must_use]
    pub fn total_queries(&self) -> usize {
        self.total_queries.load(Ordering::SeqCst) as usize
    }

    #[must_use]
    pub fn completed_queries(&self) -> usize {
        self.completed_queries.load(Ordering::SeqCst) as usize
    }

    #[must_use]
    pub fn total_records(&self) -> u64 {
        u64::from(self.total_records.load(Ordering::SeqCst))
    }

    #[must_use]
    pub fn processed_records(&self) -> u64 {
        u64::from(self.processed_records.load(Ordering::SeqCst))
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed_queries.lock().unwrap().len()
    }

    #[must_use]
    pub fn all_queries_failed(&self) -> bool {
        let total = self.total_queries();
        total > 0 && self.failed_count() == total
    }

    /// Logs a run summary at `info` level and returns it as a plain struct
    /// for callers (e.g. the CLI) that want to render it themselves.
    pub fn log_summary(&self) {
        let failed = self.failed_queries.lock().unwrap();
        let partial = self.partial_failures.lock().unwrap();

        tracing::info!(
            total_queries = self.total_queries(),
            completed_queries = self.completed_queries(),
            total_records = self.total_records(),
            processed_records = self.processed_records(),
            failed_queries = failed.len(),
            partial_failures = partial.len(),
            "run summary"
        );

        for (query_id, reason) in failed.iter() {
            tracing::warn!(query_id, reason, "query failed");
        }
        for (query_id, batches) in partial.iter() {
            tracing::warn!(query_id, failed_batch_count = batches.len(), "query partially failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_queries_failed_is_false_before_any_failure_recorded() {
        let stats = Stats::new();
        stats.set_total_queries(3);
        assert!(!stats.all_queries_failed());
    }

    #[test]
    fn all_queries_failed_is_true_once_every_query_is_recorded_failed() {
        let stats = Stats::new();
        stats.set_total_queries(2);
        stats.add_failed_query("a", "timeout");
        stats.add_failed_query("b", "timeout");
        assert!(stats.all_queries_failed());
    }

    #[test]
    fn all_queries_failed_is_false_with_zero_total_queries() {
        let stats = Stats::new();
        assert!(!stats.all_queries_failed());
    }

    #[test]
    fn counters_accumulate_across_concurrent_style_calls() {
        let stats = Stats::new();
        stats.add_total_records(100);
        stats.add_total_records(50);
        stats.add_processed_records(30);
        assert_eq!(stats.total_records(), 150);
        assert_eq!(stats.processed_records(), 30);
    }

    #[test]
    fn partial_failures_are_tracked_per_query() {
        let stats = Stats::new();
        stats.add_partial_failures("q1", vec![BatchInfo { batch_num: 1, start: 0, size: 500 }]);
        assert_eq!(stats.partial_failures.lock().unwrap().len(), 1);
    }
}
