//! Rate limiting implementation
//!
//! Token bucket limiter from the governor crate.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Configuration for rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per second
    pub requests_per_second: NonZeroU32,
    /// Burst size (max tokens in bucket)
    pub burst_size: NonZeroU32,
}

impl RateLimiterConfig {
    /// Limit to `requests_per_second`, allowing a burst of the same size.
    ///
    /// Returns `None` for a zero rate.
    pub fn per_second(requests_per_second: u32) -> Option<Self> {
        let rate = NonZeroU32::new(requests_per_second)?;
        Some(Self {
            requests_per_second: rate,
            burst_size: rate,
        })
    }

    /// Override the burst size; zero is ignored
    #[must_use]
    pub fn with_burst(mut self, burst_size: u32) -> Self {
        if let Some(burst) = NonZeroU32::new(burst_size) {
            self.burst_size = burst;
        }
        self
    }
}

/// Token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let quota = Quota::per_second(config.requests_per_second).allow_burst(config.burst_size);
        Self {
            limiter: Arc::new(Governor::direct(quota)),
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}
