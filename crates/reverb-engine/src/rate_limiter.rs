use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use reverb_core::current_unix_timestamp_ms;
use reverb_domain::RateLimit;
use tokio::sync::Mutex;

use crate::contracts::RateLimiter;

#[derive(Debug, Default)]
/// In-process sliding-window rate limiter: per-key delivery timestamps,
/// pruned on consumption. Safe under concurrent webhook batches via its
/// internal lock; enforcement across processes is best-effort by design.
pub struct SlidingWindowRateLimiter {
    deliveries: Mutex<HashMap<String, Vec<u64>>>,
}

impl SlidingWindowRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only window check at a pinned instant.
    pub async fn check_at(&self, key: &str, limit: &RateLimit, now_unix_ms: u64) -> bool {
        let window_start = now_unix_ms.saturating_sub(limit.window_ms());
        let deliveries = self.deliveries.lock().await;
        let in_window = deliveries
            .get(key)
            .map(|stamps| {
                stamps
                    .iter()
                    .filter(|&&stamp| stamp >= window_start)
                    .count()
            })
            .unwrap_or(0);
        in_window < limit.count as usize
    }

    /// Records one consumed unit at a pinned instant and prunes entries that
    /// fell out of the window.
    pub async fn increment_at(&self, key: &str, limit: &RateLimit, now_unix_ms: u64) {
        let window_start = now_unix_ms.saturating_sub(limit.window_ms());
        let mut deliveries = self.deliveries.lock().await;
        let stamps = deliveries.entry(key.to_string()).or_default();
        stamps.retain(|&stamp| stamp >= window_start);
        stamps.push(now_unix_ms);
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowRateLimiter {
    async fn check(&self, key: &str, limit: &RateLimit) -> Result<bool> {
        Ok(self.check_at(key, limit, current_unix_timestamp_ms()).await)
    }

    async fn increment(&self, key: &str, limit: &RateLimit) -> Result<()> {
        self.increment_at(key, limit, current_unix_timestamp_ms())
            .await;
        Ok(())
    }
}
