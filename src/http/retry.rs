//! Generic exponential-backoff retry wrapper used by every call that talks
//! to the upstream service.

use crate::error::PipelineError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Backoff schedule: `delay = base * multiplier^(attempt-1)`, capped at
/// `max_delay`, then jittered by `±(randomization_factor * delay)` sampled
/// uniformly. Matches the defaults of the retry engine this is ported from:
/// 5 attempts, 2s base, 10s cap, ×1.5 growth, ±20% jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub randomization_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            multiplier: 1.5,
            randomization_factor: 0.2,
        }
    }
}

fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let raw = config.base_delay.as_secs_f64() * config.multiplier.powi(attempt as i32 - 1);
    let capped = raw.min(config.max_delay.as_secs_f64());

    if config.randomization_factor <= 0.0 {
        return Duration::from_secs_f64(capped);
    }

    let delta = config.randomization_factor * capped;
    let min_delay = (capped - delta).max(0.0);
    let max_delay = capped + delta;
    let jittered = min_delay + fastrand::f64() * (max_delay - min_delay);
    Duration::from_secs_f64(jittered)
}

/// Runs `f` up to `config.max_retries` times, backing off between attempts.
/// Stops early if the error is not retryable (per [`PipelineError::is_retryable`])
/// or `cancel` fires.
///
/// # Errors
///
/// Returns the last error seen once retries are exhausted, the first
/// non-retryable error encountered, or a timeout error if `cancel` fires
/// while waiting for a result or sleeping between attempts.
pub async fn retry<T, F, Fut>(
    operation_name: &str,
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut f: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut attempt = 1;
    loop {
        if cancel.is_cancelled() {
            return Err(PipelineError::timeout(format!("{operation_name}: cancelled")));
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PipelineError::timeout(format!("{operation_name}: cancelled"))),
            r = f() => r,
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation = operation_name, attempt, "retry succeeded");
                }
                return Ok(value);
            }
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }
                if attempt >= config.max_retries {
                    tracing::warn!(operation = operation_name, attempt, error = %err, "retries exhausted");
                    return Err(err);
                }

                let delay = calculate_delay(attempt, config);
                tracing::warn!(operation = operation_name, attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after delay");

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(PipelineError::timeout(format!("{operation_name}: cancelled during backoff"))),
                    () = tokio::time::sleep(delay) => {}
                }

                attempt += 1;
            }
        }
    }
}
