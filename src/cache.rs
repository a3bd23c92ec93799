//! In-memory caching using moka
//!
//! Holds listing pricing settings and active tier tables. Tier data is read
//! on every preview, so it is cached per listing and dropped on every write.
//!
//! Read-through callers take an `epoch()` before reading the store and hand it
//! back to `put_tiers`/`put_listing`. An invalidation that lands between the
//! read and the insert bumps the epoch, and the stale entry is dropped again.

use moka::future::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::pricing::{ListingPricing, PricingTier};

/// Application cache keyed by listing id
#[derive(Clone)]
pub struct AppCache {
    /// Active tiers ordered by tier_order (listing_id -> tiers)
    pub tiers: Cache<Uuid, Arc<Vec<PricingTier>>>,
    /// Listing pricing settings (listing_id -> settings)
    pub listings: Cache<Uuid, Arc<ListingPricing>>,
    /// Bumped by every invalidation
    epoch: Arc<AtomicU64>,
}

impl AppCache {
    /// Create a cache with the given per-map capacity and TTL
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            tiers: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),

            listings: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),

            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            tiers_size: self.tiers.entry_count(),
            listings_size: self.listings.entry_count(),
        }
    }

    /// Current invalidation epoch; take it before reading the store
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Cache a tier table read at `epoch`, unless an invalidation raced it
    pub async fn put_tiers(&self, listing_id: Uuid, tiers: Arc<Vec<PricingTier>>, epoch: u64) {
        self.tiers.insert(listing_id, tiers).await;
        if self.epoch() != epoch {
            self.tiers.invalidate(&listing_id).await;
            debug!(%listing_id, "Dropped tier table read before an invalidation");
        }
    }

    /// Cache listing settings read at `epoch`, unless an invalidation raced it
    pub async fn put_listing(&self, listing_id: Uuid, listing: Arc<ListingPricing>, epoch: u64) {
        self.listings.insert(listing_id, listing).await;
        if self.epoch() != epoch {
            self.listings.invalidate(&listing_id).await;
            debug!(%listing_id, "Dropped listing settings read before an invalidation");
        }
    }

    /// Drop everything cached for one listing
    pub async fn invalidate_listing(&self, listing_id: Uuid) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.tiers.invalidate(&listing_id).await;
        self.listings.invalidate(&listing_id).await;
        debug!("Cache invalidated for listing: {}", listing_id);
    }
}

impl Default for AppCache {
    fn default() -> Self {
        // 1000 listings, 5 min TTL
        Self::new(1000, Duration::from_secs(5 * 60))
    }
}

/// Cache statistics for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub tiers_size: u64,
    pub listings_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PricingModel;

    fn listing(listing_id: Uuid) -> ListingPricing {
        ListingPricing {
            listing_id,
            pricing_model: PricingModel::Tiered,
            base_price: None,
            currency: "USD".to_string(),
            tiers_version: 3,
        }
    }

    #[tokio::test]
    async fn test_invalidate_listing_only_touches_that_listing() {
        let cache = AppCache::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        cache.listings.insert(a, Arc::new(listing(a))).await;
        cache.listings.insert(b, Arc::new(listing(b))).await;
        cache.tiers.insert(a, Arc::new(Vec::new())).await;

        cache.invalidate_listing(a).await;

        assert!(cache.listings.get(&a).await.is_none());
        assert!(cache.tiers.get(&a).await.is_none());
        assert!(cache.listings.get(&b).await.is_some());
    }

    #[tokio::test]
    async fn test_put_keeps_entry_when_nothing_intervened() {
        let cache = AppCache::new(10, Duration::from_secs(60));
        let a = Uuid::new_v4();

        let epoch = cache.epoch();
        cache.put_listing(a, Arc::new(listing(a)), epoch).await;
        cache.put_tiers(a, Arc::new(Vec::new()), epoch).await;

        assert!(cache.listings.get(&a).await.is_some());
        assert!(cache.tiers.get(&a).await.is_some());
    }

    #[tokio::test]
    async fn test_put_after_concurrent_invalidation_is_dropped() {
        let cache = AppCache::new(10, Duration::from_secs(60));
        let a = Uuid::new_v4();

        // Reader takes the epoch and reads the old table, then a writer
        // commits and invalidates before the reader caches its result.
        let epoch = cache.epoch();
        cache.invalidate_listing(a).await;
        cache.put_tiers(a, Arc::new(Vec::new()), epoch).await;
        cache.put_listing(a, Arc::new(listing(a)), epoch).await;

        assert!(cache.tiers.get(&a).await.is_none());
        assert!(cache.listings.get(&a).await.is_none());

        // The next read-through caches normally.
        let epoch = cache.epoch();
        cache.put_tiers(a, Arc::new(Vec::new()), epoch).await;
        assert!(cache.tiers.get(&a).await.is_some());
    }
}
