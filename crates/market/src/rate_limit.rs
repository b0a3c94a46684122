//! Per-endpoint outbound rate limiting.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Spaces calls to each logical API endpoint by a minimum interval.
///
/// The table of last-call timestamps is shared: any task about to hit
/// an endpoint calls [`RateLimiter::throttle`] first and is suspended
/// until the interval since the previous call on that endpoint name has
/// elapsed. Different endpoint names never block each other.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: DashMap<&'static str, Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: DashMap::new(),
        }
    }

    /// Suspend until the endpoint may be called again, then record the
    /// call time.
    pub async fn throttle(&self, endpoint: &'static str) {
        let wait = match self.last_call.get(endpoint) {
            Some(last) => (*last + self.min_interval).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        };

        if !wait.is_zero() {
            debug!(endpoint, wait_ms = wait.as_millis() as u64, "rate limited");
            tokio::time::sleep(wait).await;
        }

        self.last_call.insert(endpoint, Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_second_call_waits_for_interval() {
        let limiter = RateLimiter::new(Duration::from_secs(1));

        limiter.throttle("simple_price").await;
        let start = Instant::now();
        limiter.throttle("simple_price").await;

        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(1));

        let start = Instant::now();
        limiter.throttle("simple_price").await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_endpoints_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(1));

        limiter.throttle("simple_price").await;
        let start = Instant::now();
        limiter.throttle("market_chart").await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_elapsed() {
        let limiter = RateLimiter::new(Duration::from_secs(1));

        limiter.throttle("simple_price").await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        let start = Instant::now();
        limiter.throttle("simple_price").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
