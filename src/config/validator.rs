//! Runtime limits derived from whether an API key is configured, and the
//! validation that keeps them inside the upstream rate limit.

use crate::error::PipelineError;
use crate::rate_limiter::{API_KEY_RATE_LIMIT, DEFAULT_RATE_LIMIT};
use std::time::Duration;

pub const DEFAULT_BUFFER_SIZE: usize = 1000;
pub const MAX_BUFFER_SIZE: usize = 10_000;
pub const DEFAULT_BATCH_SIZE: u64 = 1000;
pub const MIN_BATCH_SIZE: u64 = 500;
pub const MAX_BATCH_SIZE: u64 = 2000;
pub const MIN_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(120 * 60);
pub const MIN_RESPONSE_SIZE: u64 = 10 << 20;
pub const MAX_RESPONSE_SIZE: u64 = 100 << 20;
pub const MAX_RET_MAX: u64 = 10_000;

const MAX_QUERY_WORKERS_WITH_KEY: usize = 3;
const MAX_ESUMMARY_WORKERS_WITH_KEY: usize = 2;
const MAX_QUERY_WORKERS_WITHOUT_KEY: usize = 1;
const MAX_ESUMMARY_WORKERS_WITHOUT_KEY: usize = 1;

/// Worker counts and size limits for one run, chosen from whether the
/// configured Entrez API key is present. Without a key the rate limit is
/// strict enough that both worker counts must be exactly 1.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    pub buffer_size: usize,
    pub max_query_workers: usize,
    pub max_esummary_workers: usize,
    pub batch_size: u64,
    pub max_response_size: u64,
    pub query_timeout: Duration,
    pub single_query_timeout: Duration,
    pub write_timeout: Duration,
    rate_limit: u32,
}

impl RuntimeConfig {
    #[must_use]
    pub fn new(has_api_key: bool) -> Self {
        let (max_query_workers, max_esummary_workers, rate_limit) = if has_api_key {
            (MAX_QUERY_WORKERS_WITH_KEY, MAX_ESUMMARY_WORKERS_WITH_KEY, API_KEY_RATE_LIMIT)
        } else {
            (MAX_QUERY_WORKERS_WITHOUT_KEY, MAX_ESUMMARY_WORKERS_WITHOUT_KEY, DEFAULT_RATE_LIMIT)
        };

        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_query_workers,
            max_esummary_workers,
            batch_size: DEFAULT_BATCH_SIZE,
            max_response_size: MAX_RESPONSE_SIZE,
            query_timeout: Duration::from_secs(30 * 60),
            single_query_timeout: Duration::from_secs(20 * 60),
            write_timeout: Duration::from_secs(10 * 60),
            rate_limit,
        }
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Parameter`] if any limit falls outside the
    /// allowed range, or if the configured worker counts would exceed the
    /// rate limit implied by whether an API key is present.
    pub fn validate(&self, has_api_key: bool) -> Result<(), PipelineError> {
        if self.buffer_size == 0 || self.buffer_size > MAX_BUFFER_SIZE {
            return Err(PipelineError::parameter(format!(
                "buffer_size must be in (0, {MAX_BUFFER_SIZE}], got {}",
                self.buffer_size
            )));
        }

        if self.batch_size < MIN_BATCH_SIZE || self.batch_size > MAX_BATCH_SIZE {
            return Err(PipelineError::parameter(format!(
                "batch_size must be in [{MIN_BATCH_SIZE}, {MAX_BATCH_SIZE}], got {}",
                self.batch_size
            )));
        }

        for (name, value) in [
            ("query_timeout", self.query_timeout),
            ("single_query_timeout", self.single_query_timeout),
            ("write_timeout", self.write_timeout),
        ] {
            if value < MIN_TIMEOUT || value > MAX_TIMEOUT || value > self.query_timeout {
                return Err(PipelineError::parameter(format!(
                    "{name} must be in [{MIN_TIMEOUT:?}, {MAX_TIMEOUT:?}] and not exceed query_timeout, got {value:?}"
                )));
            }
        }

        if self.max_response_size < MIN_RESPONSE_SIZE || self.max_response_size > MAX_RESPONSE_SIZE {
            return Err(PipelineError::parameter(format!(
                "max_response_size must be in [{MIN_RESPONSE_SIZE}, {MAX_RESPONSE_SIZE}], got {}",
                self.max_response_size
            )));
        }

        if !has_api_key && (self.max_query_workers != 1 || self.max_esummary_workers != 1) {
            return Err(PipelineError::parameter(
                "without an API key, max_query_workers and max_esummary_workers must both be 1",
            ));
        }

        let total_requests = self.max_query_workers * (1 + self.max_esummary_workers);
        if total_requests > self.rate_limit as usize {
            return Err(PipelineError::parameter(format!(
                "max_query_workers * (1 + max_esummary_workers) = {total_requests} exceeds the rate limit of {}",
                self.rate_limit
            )));
        }

        Ok(())
    }
}

/// Validates the Entrez wire parameters shared by every search request.
///
/// # Errors
///
/// Returns [`PipelineError::Parameter`] if `ret_max` exceeds the upstream
/// per-request ID cap or `ret_mode` names an unsupported wire format.
pub fn validate_entrez_setting(ret_max: u64, ret_mode: &str) -> Result<(), PipelineError> {
    if ret_max > MAX_RET_MAX {
        return Err(PipelineError::parameter(format!("ret_max must be <= {MAX_RET_MAX}, got {ret_max}")));
    }
    if ret_mode != "xml" && ret_mode != "json" {
        return Err(PipelineError::parameter(format!(r#"ret_mode must be "xml" or "json", got {ret_mode:?}"#)));
    }
    Ok(())
}

/// Clamps a worker count to the number of actual work items, so a small
/// batch of queries doesn't spin up idle workers.
#[must_use]
pub fn worker_count(configured_max: usize, item_count: usize) -> usize {
    configured_max.min(item_count).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_with_api_key_passes_validation() {
        let config = RuntimeConfig::new(true);
        assert!(config.validate(true).is_ok());
    }

    #[test]
    fn default_config_without_api_key_passes_validation() {
        let config = RuntimeConfig::new(false);
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn worker_invariant_is_enforced_for_the_keyed_rate() {
        let mut config = RuntimeConfig::new(true);
        config.max_query_workers = 4;
        config.max_esummary_workers = 2;
        assert!(config.validate(true).is_err());
    }

    #[test]
    fn without_api_key_workers_must_both_be_exactly_one() {
        let mut config = RuntimeConfig::new(false);
        config.max_query_workers = 2;
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn batch_size_out_of_range_is_rejected() {
        let mut config = RuntimeConfig::new(true);
        config.batch_size = 100;
        assert!(config.validate(true).is_err());
        config.batch_size = 5000;
        assert!(config.validate(true).is_err());
    }

    #[test]
    fn worker_count_clamps_to_item_count_but_never_below_one() {
        assert_eq!(worker_count(3, 10), 3);
        assert_eq!(worker_count(3, 2), 2);
        assert_eq!(worker_count(3, 0), 1);
    }

    #[test]
    fn entrez_setting_within_bounds_is_accepted() {
        assert!(validate_entrez_setting(10_000, "xml").is_ok());
        assert!(validate_entrez_setting(0, "json").is_ok());
    }

    #[test]
    fn ret_max_over_the_cap_is_rejected() {
        assert!(validate_entrez_setting(10_001, "xml").is_err());
    }

    #[test]
    fn ret_mode_outside_the_supported_set_is_rejected() {
        assert!(validate_entrez_setting(100, "csv").is_err());
    }
}
