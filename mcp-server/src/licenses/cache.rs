//! Single-slot, time-bounded cache in front of the consumed-licenses walk.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use ghe_mcp_common::LicenseAggregate;
use tokio::sync::{Mutex, RwLock};

use super::LicenseSource;
use crate::error::Result;

/// Default time-to-live of a cached aggregate.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3 * 60 * 60);

struct CacheEntry {
    aggregate: Arc<LicenseAggregate>,
    stored_at: Instant,
}

/// Holds at most one normalized aggregate.
///
/// Concurrent misses are not coalesced unless `single_flight` is enabled:
/// each caller walks all pages itself and the last one to finish wins the
/// slot. The slot lock is only held to read or swap the entry, never across
/// a fetch.
pub struct LicenseCache {
    source: Arc<dyn LicenseSource>,
    ttl: Duration,
    slot: RwLock<Option<CacheEntry>>,
    fetch_lock: Option<Mutex<()>>,
}

impl LicenseCache {
    pub fn new(source: Arc<dyn LicenseSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slot: RwLock::new(None),
            fetch_lock: None,
        }
    }

    /// Let only one caller at a time refill the slot. Waiting callers re-check
    /// the slot before fetching.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.fetch_lock = enabled.then(|| Mutex::new(()));
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached aggregate if it is younger than the TTL, otherwise
    /// walk all pages, normalize, store and return the result.
    /// `force_refresh` always walks.
    pub async fn get_aggregate(&self, force_refresh: bool) -> Result<Arc<LicenseAggregate>> {
        if !force_refresh {
            if let Some(aggregate) = self.fresh().await {
                return Ok(aggregate);
            }
        }

        let _guard = match &self.fetch_lock {
            Some(lock) => {
                let guard = lock.lock().await;
                if !force_refresh {
                    if let Some(aggregate) = self.fresh().await {
                        return Ok(aggregate);
                    }
                }
                Some(guard)
            }
            None => None,
        };

        tracing::info!(force_refresh, "Consumed-licenses cache miss, fetching all pages");
        let raw = self.source.fetch_all().await?;
        let aggregate = Arc::new(raw.normalize(Utc::now()));

        *self.slot.write().await = Some(CacheEntry {
            aggregate: aggregate.clone(),
            stored_at: Instant::now(),
        });

        Ok(aggregate)
    }

    async fn fresh(&self) -> Option<Arc<LicenseAggregate>> {
        let slot = self.slot.read().await;
        let entry = slot.as_ref()?;
        let age = entry.stored_at.elapsed();
        if age < self.ttl {
            tracing::debug!(age_secs = age.as_secs(), "Consumed-licenses cache hit");
            Some(entry.aggregate.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use ghe_mcp_common::{RawLicenseAggregate, RawLicensePage};
    use serde_json::json;

    use crate::error::Error;

    /// Source returning a one-seat aggregate and counting walks.
    #[derive(Default)]
    struct CountingSource {
        walks: AtomicUsize,
        delay: Option<Duration>,
        fail: bool,
    }

    #[async_trait]
    impl LicenseSource for CountingSource {
        async fn fetch_all(&self) -> Result<RawLicenseAggregate> {
            let walk = self.walks.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(Error::RequestFailure {
                    status: 404,
                    body: "Not Found".to_string(),
                });
            }
            let mut aggregate = RawLicenseAggregate::default();
            aggregate.push_page(
                serde_json::from_value::<RawLicensePage>(json!({
                    "total_seats_purchased": 10,
                    "total_seats_consumed": walk,
                    "users": [{ "github_com_login": "octocat" }]
                }))
                .unwrap(),
            );
            Ok(aggregate)
        }

        async fn fetch_first_page(&self) -> Result<RawLicenseAggregate> {
            self.fetch_all().await
        }
    }

    #[tokio::test]
    async fn test_hit_within_ttl_does_not_refetch() {
        let source = Arc::new(CountingSource::default());
        let cache = LicenseCache::new(source.clone(), DEFAULT_TTL);

        let first = cache.get_aggregate(false).await.unwrap();
        let second = cache.get_aggregate(false).await.unwrap();

        assert_eq!(source.walks.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.seats[0].login.as_deref(), Some("octocat"));
    }

    #[tokio::test]
    async fn test_force_refresh_always_fetches() {
        let source = Arc::new(CountingSource::default());
        let cache = LicenseCache::new(source.clone(), DEFAULT_TTL);

        cache.get_aggregate(false).await.unwrap();
        let refreshed = cache.get_aggregate(true).await.unwrap();
        assert_eq!(source.walks.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed.total_seats_consumed, 2);

        // The refreshed document replaced the slot.
        let cached = cache.get_aggregate(false).await.unwrap();
        assert_eq!(cached.total_seats_consumed, 2);
        assert_eq!(source.walks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let source = Arc::new(CountingSource::default());
        let cache = LicenseCache::new(source.clone(), Duration::ZERO);

        cache.get_aggregate(false).await.unwrap();
        cache.get_aggregate(false).await.unwrap();
        assert_eq!(source.walks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_slot_empty() {
        let source = Arc::new(CountingSource {
            fail: true,
            ..CountingSource::default()
        });
        let cache = LicenseCache::new(source.clone(), DEFAULT_TTL);

        assert!(cache.get_aggregate(false).await.is_err());
        assert!(cache.get_aggregate(false).await.is_err());
        assert_eq!(source.walks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_each_fetch() {
        let source = Arc::new(CountingSource {
            delay: Some(Duration::from_millis(50)),
            ..CountingSource::default()
        });
        let cache = Arc::new(LicenseCache::new(source.clone(), DEFAULT_TTL));

        let (a, b) = tokio::join!(cache.get_aggregate(false), cache.get_aggregate(false));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(source.walks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_flight_coalesces_concurrent_misses() {
        let source = Arc::new(CountingSource {
            delay: Some(Duration::from_millis(50)),
            ..CountingSource::default()
        });
        let cache = Arc::new(
            LicenseCache::new(source.clone(), DEFAULT_TTL).with_single_flight(true),
        );

        let (a, b) = tokio::join!(cache.get_aggregate(false), cache.get_aggregate(false));
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(source.walks.load(Ordering::SeqCst), 1);
    }
}
