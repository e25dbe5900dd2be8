//! Per-user sliding-window rate limiting over the shared cache.
//!
//! Each admitted event appends its timestamp to the history stored under
//! `ratelimit:{scope}:{key}`. The read-modify-write is not atomic, so
//! concurrent requests from one user can slip slightly past the quota.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::cache_service::CacheBackend;
use crate::config::RateQuota;

#[derive(Clone)]
pub struct SlidingWindowLimiter {
    cache: Arc<dyn CacheBackend>,
    scope: String,
    quota: RateQuota,
}

impl SlidingWindowLimiter {
    pub fn new(cache: Arc<dyn CacheBackend>, scope: impl Into<String>, quota: RateQuota) -> Self {
        Self {
            cache,
            scope: scope.into(),
            quota,
        }
    }

    pub fn quota(&self) -> RateQuota {
        self.quota
    }

    /// Record an event for `key` if the quota allows it.
    ///
    /// Over quota, returns the number of seconds until the oldest event in
    /// the window expires (at least 1).
    pub async fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Utc::now().timestamp_millis()).await
    }

    /// Same as [`check`](Self::check) with an explicit clock in milliseconds.
    pub async fn check_at(&self, key: &str, now_ms: i64) -> Result<(), u64> {
        let cache_key = format!("ratelimit:{}:{}", self.scope, key);
        let window_ms = i64::try_from(self.quota.window.as_millis()).unwrap_or(i64::MAX);

        let mut history: Vec<i64> = match self.cache.get(&cache_key).await {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_i64).collect(),
            _ => Vec::new(),
        };
        history.retain(|&ts| ts > now_ms.saturating_sub(window_ms));

        if history.len() >= self.quota.limit {
            let oldest = history.iter().copied().min().unwrap_or(now_ms);
            let wait_ms = (oldest.saturating_add(window_ms) - now_ms).max(0);
            let retry_after = ((wait_ms + 999) / 1000).max(1) as u64;
            debug!(scope = %self.scope, key, retry_after, "Rate limit exceeded");
            return Err(retry_after);
        }

        history.push(now_ms);
        self.cache
            .set(&cache_key, Value::from(history), self.quota.window)
            .await;
        Ok(())
    }
}
