//! Fixed-window rate limiter keyed by an arbitrary bucket string.
//!
//! Generalizes the teacher's `RoomRateLimiter` (`rate_limit.rs`), which
//! hard-coded two counters per player, into a limiter that can express every
//! bucket the command surface needs (`ip:{ip}:create_room`,
//! `room:{code}:player:{id}:submit_prompt`, ...) by keying on the bucket
//! string itself plus a caller-supplied `(limit, window)` pair.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Quota {
    pub limit: u32,
    pub window: Duration,
}

impl Quota {
    pub const fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            window: Duration::from_secs(60),
        }
    }

    pub const fn per_second(limit: u32) -> Self {
        Self {
            limit,
            window: Duration::from_secs(1),
        }
    }

    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

#[derive(Debug, Clone)]
struct Window {
    count: u32,
    window_start: Instant,
}

impl Window {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }

    fn maybe_reset(&mut self, quota: Quota) {
        if self.window_start.elapsed() >= quota.window {
            self.count = 0;
            self.window_start = Instant::now();
        }
    }

    fn try_consume(&mut self, quota: Quota) -> Result<(), Duration> {
        self.maybe_reset(quota);
        if self.count < quota.limit {
            self.count += 1;
            Ok(())
        } else {
            Err(quota.window.saturating_sub(self.window_start.elapsed()))
        }
    }
}

/// Error returned when a bucket has exceeded its quota.
#[derive(Debug, Clone)]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

/// Process-local fixed-window counter store, designed so the call sites
/// wouldn't need to change if it were later backed by a shared counter
/// store (e.g. Redis), per the design spec's rate limiter section.
pub struct RateLimiter {
    buckets: RwLock<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Check and consume one unit of quota for `bucket`.
    pub async fn check(&self, bucket: &str, quota: Quota) -> Result<(), RateLimitExceeded> {
        let mut buckets = self.buckets.write().await;
        let window = buckets.entry(bucket.to_string()).or_insert_with(Window::new);
        window
            .try_consume(quota)
            .map_err(|retry_after| RateLimitExceeded { retry_after })
    }

    /// Remove buckets untouched for a while, to keep the map from growing
    /// without bound across short-lived IPs/rooms/players.
    pub async fn cleanup_stale(&self, retention: Duration) {
        let mut buckets = self.buckets.write().await;
        let now = Instant::now();
        buckets.retain(|_, window| now.duration_since(window.window_start) < retention);
    }

    pub fn start_cleanup_task(self: Arc<Self>, interval: Duration, retention: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.cleanup_stale(retention).await;
            }
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let quota = Quota::new(2, Duration::from_millis(100));

        assert!(limiter.check("bucket", quota).await.is_ok());
        assert!(limiter.check("bucket", quota).await.is_ok());
        assert!(limiter.check("bucket", quota).await.is_err());
    }

    #[tokio::test]
    async fn window_resets_after_elapsed_time() {
        let limiter = RateLimiter::new();
        let quota = Quota::new(1, Duration::from_millis(50));

        assert!(limiter.check("bucket", quota).await.is_ok());
        assert!(limiter.check("bucket", quota).await.is_err());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(limiter.check("bucket", quota).await.is_ok());
    }

    #[tokio::test]
    async fn buckets_are_independent() {
        let limiter = RateLimiter::new();
        let quota = Quota::new(1, Duration::from_secs(60));

        assert!(limiter.check("a", quota).await.is_ok());
        assert!(limiter.check("b", quota).await.is_ok());
        assert!(limiter.check("a", quota).await.is_err());
    }

    #[tokio::test]
    async fn cleanup_removes_stale_entries() {
        let limiter = RateLimiter::new();
        let quota = Quota::new(1, Duration::from_millis(10));
        let _ = limiter.check("stale", quota).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.cleanup_stale(Duration::from_millis(20)).await;

        assert_eq!(limiter.buckets.read().await.len(), 0);
    }
}
