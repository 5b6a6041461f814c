//! Short-lived response cache for the statistics endpoints.
//!
//! Entries are keyed by endpoint and expire `ttl` after they were computed.
//! The lock is not held while computing, so two callers racing on an expired
//! entry may both recompute; the later write wins.

use chrono::{DateTime, Duration, Utc};
use hackops_core::environment::Clock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// TTL cache of computed values.
pub struct TtlCache<V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<&'static str, (DateTime<Utc>, V)>>,
}

impl<V: Clone> TtlCache<V> {
    /// Cache whose entries live for `ttl`. A zero TTL disables caching.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value for `key`, or the result of `compute` (stored on success).
    ///
    /// # Errors
    ///
    /// Whatever `compute` returns; failures are not cached.
    pub async fn get_or_try_insert<F, Fut, E>(&self, key: &'static str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if self.ttl <= Duration::zero() {
            return compute().await;
        }

        let now = self.clock.now();
        if let Some((computed_at, value)) = self.entries.lock().await.get(key) {
            if now - *computed_at < self.ttl {
                tracing::trace!(key, "Stats cache hit");
                return Ok(value.clone());
            }
        }

        let value = compute().await?;
        self.entries
            .lock()
            .await
            .insert(key, (self.clock.now(), value.clone()));
        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ManualClock(StdMutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    async fn counting(cache: &TtlCache<u32>, calls: &AtomicU32) -> u32 {
        cache
            .get_or_try_insert("apps", || async {
                Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn serves_cached_value_until_expiry() {
        let clock = Arc::new(ManualClock(StdMutex::new(Utc::now())));
        let cache = TtlCache::new(Duration::seconds(300), clock.clone());
        let calls = AtomicU32::new(0);

        assert_eq!(counting(&cache, &calls).await, 1);
        clock.advance(Duration::seconds(299));
        assert_eq!(counting(&cache, &calls).await, 1);
        clock.advance(Duration::seconds(1));
        assert_eq!(counting(&cache, &calls).await, 2);
    }

    #[tokio::test]
    async fn zero_ttl_always_recomputes() {
        let clock = Arc::new(ManualClock(StdMutex::new(Utc::now())));
        let cache = TtlCache::new(Duration::zero(), clock);
        let calls = AtomicU32::new(0);

        assert_eq!(counting(&cache, &calls).await, 1);
        assert_eq!(counting(&cache, &calls).await, 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let clock = Arc::new(ManualClock(StdMutex::new(Utc::now())));
        let cache: TtlCache<u32> = TtlCache::new(Duration::seconds(60), clock);

        let failed = cache.get_or_try_insert("apps", || async { Err("down") }).await;
        assert_eq!(failed, Err("down"));
        let ok = cache.get_or_try_insert("apps", || async { Ok::<_, &str>(7) }).await;
        assert_eq!(ok, Ok(7));
    }
}
