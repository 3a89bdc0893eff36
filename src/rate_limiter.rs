//! A single token bucket shared by every request the pipeline issues.
//!
//! Entrez-style services cap requests per second by source IP/API key: 3
//! requests/second without a key, 10/second with one, burst size 1. One
//! limiter instance is shared across all query and summary workers so the
//! cap holds regardless of how many are running concurrently.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

pub const DEFAULT_RATE_LIMIT: u32 = 3;
pub const API_KEY_RATE_LIMIT: u32 = 10;
const BURST_SIZE: u32 = 1;

/// Wraps a `governor` direct rate limiter at the rate implied by whether an
/// API key is configured.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
    rate: u32,
}

impl RateLimiter {
    #[must_use]
    pub fn new(has_api_key: bool) -> Self {
        let rate = if has_api_key { API_KEY_RATE_LIMIT } else { DEFAULT_RATE_LIMIT };
        Self::with_rate(rate)
    }

    #[must_use]
    pub fn with_rate(rate: u32) -> Self {
        let burst = NonZeroU32::new(BURST_SIZE).expect("burst size is a nonzero constant");
        let per_second = NonZeroU32::new(rate.max(1)).expect("rate.max(1) is nonzero");
        let quota = Quota::per_second(per_second).allow_burst(burst);
        Self { limiter: Arc::new(GovernorLimiter::direct(quota)), rate }
    }

    /// Blocks the caller until a token is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    #[must_use]
    pub fn current_rate(&self) -> u32 {
        self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_api_key_uses_default_rate() {
        let limiter = RateLimiter::new(false);
        assert_eq!(limiter.current_rate(), DEFAULT_RATE_LIMIT);
    }

    #[test]
    fn with_api_key_uses_higher_rate() {
        let limiter = RateLimiter::new(true);
        assert_eq!(limiter.current_rate(), API_KEY_RATE_LIMIT);
    }

    #[tokio::test]
    async fn wait_grants_the_first_token_immediately() {
        let limiter = RateLimiter::with_rate(10);
        tokio::time::timeout(std::time::Duration::from_millis(50), limiter.wait())
            .await
            .expect("first token should be immediately available");
    }
}
