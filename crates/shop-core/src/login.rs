//! # Login Attempt Tracking
//!
//! Throttles admin logins per caller key (usually the client address).
//! Failures accumulate while attempts keep arriving; a key that stays quiet
//! for the whole window starts over.

use crate::error::{ShopError, ShopResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Failed attempts allowed before a key is locked out
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Idle period after which a key's failures are forgotten
pub const ATTEMPT_WINDOW: Duration = Duration::from_secs(15 * 60);

#[async_trait]
pub trait LoginAttemptTracker: Send + Sync {
    /// `RateLimited` if `key` has used up its attempts
    async fn check(&self, key: &str) -> ShopResult<()>;

    async fn record_failure(&self, key: &str);

    /// Forget `key`, called after a successful login
    async fn reset(&self, key: &str);
}

/// Type alias for a shared tracker (dynamic dispatch)
pub type BoxedLoginAttemptTracker = Arc<dyn LoginAttemptTracker>;

#[derive(Debug, Clone, Copy)]
struct AttemptRecord {
    failures: u32,
    last_attempt: Instant,
}

/// Single-instance tracker backed by a mutex-guarded map
#[derive(Debug)]
pub struct InMemoryLoginAttempts {
    max_failures: u32,
    window: Duration,
    records: Mutex<HashMap<String, AttemptRecord>>,
}

impl Default for InMemoryLoginAttempts {
    fn default() -> Self {
        Self::new(MAX_FAILED_ATTEMPTS, ATTEMPT_WINDOW)
    }
}

impl InMemoryLoginAttempts {
    pub fn new(max_failures: u32, window: Duration) -> Self {
        Self {
            max_failures,
            window,
            records: Mutex::new(HashMap::new()),
        }
    }

    fn is_stale(&self, record: &AttemptRecord, now: Instant) -> bool {
        now.duration_since(record.last_attempt) >= self.window
    }
}

#[async_trait]
impl LoginAttemptTracker for InMemoryLoginAttempts {
    async fn check(&self, key: &str) -> ShopResult<()> {
        let now = Instant::now();
        let mut records = self.records.lock().await;

        let Some(record) = records.get(key).copied() else {
            return Ok(());
        };
        if self.is_stale(&record, now) {
            records.remove(key);
            return Ok(());
        }
        if record.failures >= self.max_failures {
            let remaining = self.window - now.duration_since(record.last_attempt);
            return Err(ShopError::RateLimited {
                retry_after_secs: remaining.as_secs().max(1),
            });
        }
        Ok(())
    }

    async fn record_failure(&self, key: &str) {
        let now = Instant::now();
        let mut records = self.records.lock().await;
        records.retain(|_, record| !self.is_stale(record, now));

        let record = records.entry(key.to_string()).or_insert(AttemptRecord {
            failures: 0,
            last_attempt: now,
        });
        record.failures += 1;
        record.last_attempt = now;
    }

    async fn reset(&self, key: &str) {
        self.records.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_locks_after_max_failures() {
        let tracker = InMemoryLoginAttempts::default();

        for _ in 0..MAX_FAILED_ATTEMPTS {
            tracker.check("10.0.0.1").await.unwrap();
            tracker.record_failure("10.0.0.1").await;
        }

        let err = tracker.check("10.0.0.1").await.unwrap_err();
        assert!(matches!(err, ShopError::RateLimited { .. }));
        assert!(tracker.check("10.0.0.2").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_unlocks() {
        let tracker = InMemoryLoginAttempts::default();
        for _ in 0..MAX_FAILED_ATTEMPTS {
            tracker.record_failure("10.0.0.1").await;
        }
        assert!(tracker.check("10.0.0.1").await.is_err());

        tokio::time::advance(ATTEMPT_WINDOW + Duration::from_secs(1)).await;
        assert!(tracker.check("10.0.0.1").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_counts_down() {
        let tracker = InMemoryLoginAttempts::default();
        for _ in 0..MAX_FAILED_ATTEMPTS {
            tracker.record_failure("k").await;
        }
        tokio::time::advance(Duration::from_secs(60)).await;

        match tracker.check("k").await {
            Err(ShopError::RateLimited { retry_after_secs }) => {
                assert_eq!(retry_after_secs, ATTEMPT_WINDOW.as_secs() - 60);
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_keys_are_evicted() {
        let tracker = InMemoryLoginAttempts::default();
        for i in 0..100 {
            tracker.record_failure(&format!("10.0.1.{}", i)).await;
        }
        assert_eq!(tracker.records.lock().await.len(), 100);

        tokio::time::advance(ATTEMPT_WINDOW).await;
        tracker.record_failure("10.0.0.1").await;

        let records = tracker.records.lock().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records["10.0.0.1"].failures, 1);
    }

    #[tokio::test]
    async fn test_reset_clears_failures() {
        let tracker = InMemoryLoginAttempts::new(2, ATTEMPT_WINDOW);
        tracker.record_failure("k").await;
        tracker.record_failure("k").await;
        assert!(tracker.check("k").await.is_err());

        tracker.reset("k").await;
        assert!(tracker.check("k").await.is_ok());
    }
}
