//! Content-addressed, file-backed cache of query results: one JSON file per
//! query ID, keyed so a resumed run can skip or retry-complete prior work.

use crate::atomic::{atomic_write, DirLock};
use crate::error::PipelineError;
use crate::types::QueryResult;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A directory of `<query_id>.json` files, each a serialized `QueryResult`.
#[derive(Clone)]
pub struct FileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self, PipelineError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, ttl })
    }

    fn entry_path(&self, query_id: &str) -> PathBuf {
        self.dir.join(format!("{query_id}.json"))
    }

    /// Reads the cached result for `query_id`, if present and not expired.
    /// A corrupt or unreadable entry is treated as a miss rather than an
    /// error, since the pipeline can always fall back to running the query
    /// fresh.
    pub async fn get(&self, query_id: &str) -> Option<QueryResult> {
        let path = self.entry_path(query_id);
        let content = tokio::fs::read_to_string(&path).await.ok()?;
        let result: QueryResult = serde_json::from_str(&content).ok()?;

        let end_time = result.end_time.unwrap_or(result.created_at);
        let age = Utc::now().signed_duration_since(end_time);
        if age.to_std().unwrap_or(Duration::ZERO) > self.ttl {
            return None;
        }

        Some(result)
    }

    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    pub async fn set(&self, query_id: &str, result: &QueryResult) -> Result<(), PipelineError> {
        let path = self.entry_path(query_id);
        let data = serde_json::to_vec_pretty(result).map_err(|e| PipelineError::save_result(e.to_string()))?;
        atomic_write(&path, &data).await?;
        Ok(())
    }

    /// Removes all cache entries whose mtime is older than `ttl`. Uses a
    /// directory-wide advisory lock so a concurrent writer's in-flight
    /// `set` isn't raced by an eviction pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be locked or listed.
    pub fn evict_expired(&self) -> Result<usize, PipelineError> {
        let _lock = DirLock::acquire(&self.dir)?;
        let mut removed = 0;

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let metadata = entry.metadata()?;
            let Ok(modified) = metadata.modified() else { continue };
            let Ok(age) = modified.elapsed() else { continue };
            if age > self.ttl {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::result::QueryStatus;
    use tempfile::TempDir;

    fn sample_result(query_id: &str) -> QueryResult {
        let mut result = QueryResult::new(query_id, "BRCA1[gene]", Utc::now());
        result.set_total_records(10);
        result.add_processed_records(10);
        result.update_basic_status(Utc::now(), false);
        result
    }

    #[tokio::test]
    async fn set_then_get_round_trips_the_result() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path(), Duration::from_secs(3600)).unwrap();
        let result = sample_result("BRCA1-abc123");

        cache.set(&result.query_id, &result).await.unwrap();
        let fetched = cache.get(&result.query_id).await.unwrap();

        assert_eq!(fetched.query_id, result.query_id);
        assert_eq!(fetched.status, QueryStatus::Success);
    }

    #[tokio::test]
    async fn missing_entry_is_a_cache_miss() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path(), Duration::from_secs(3600)).unwrap();
        assert!(cache.get("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path(), Duration::from_millis(1)).unwrap();
        let result = sample_result("BRCA1-abc123");
        cache.set(&result.query_id, &result).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get(&result.query_id).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_is_treated_as_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path(), Duration::from_secs(3600)).unwrap();
        tokio::fs::write(dir.path().join("bad-id.json"), b"not json").await.unwrap();
        assert!(cache.get("bad-id").await.is_none());
    }
}
