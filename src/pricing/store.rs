//! Tier persistence.
//!
//! `TierStore` is the seam between tier management and storage. The
//! PostgreSQL implementation wraps each write and its version bump in one
//! transaction, so a reorder either lands completely or not at all.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{ListingPricing, PricingTier, TierDraft};
use super::queries;
use super::services::PricingError;

/// A tier as written, with the listing's tier-set version after the write.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenTier {
    pub tier: PricingTier,
    pub tiers_version: i64,
}

/// Result of applying an explicit ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReorderOutcome {
    Reordered {
        tiers: Vec<PricingTier>,
        tiers_version: i64,
    },
    /// The requested order was already in place; nothing was written
    Unchanged {
        tiers: Vec<PricingTier>,
        tiers_version: i64,
    },
}

#[async_trait]
pub trait TierStore: Send + Sync {
    async fn listing_pricing(&self, listing_id: Uuid) -> Result<Option<ListingPricing>, PricingError>;

    /// Active tiers ordered by `tier_order`.
    async fn active_tiers(&self, listing_id: Uuid) -> Result<Vec<PricingTier>, PricingError>;

    async fn get_tier(&self, tier_id: Uuid) -> Result<Option<PricingTier>, PricingError>;

    async fn insert_tier(
        &self,
        listing_id: Uuid,
        tier_order: i32,
        draft: &TierDraft,
    ) -> Result<WrittenTier, PricingError>;

    async fn update_tier(
        &self,
        tier_id: Uuid,
        tier_order: i32,
        draft: &TierDraft,
    ) -> Result<WrittenTier, PricingError>;

    async fn deactivate_tier(&self, tier_id: Uuid) -> Result<WrittenTier, PricingError>;

    /// Atomically renumber the listing's active tiers to follow `ordered_ids`.
    async fn apply_ordering(
        &self,
        listing_id: Uuid,
        ordered_ids: &[Uuid],
        expected_version: Option<i64>,
    ) -> Result<ReorderOutcome, PricingError>;
}

/// Work out the `tier_order` assignment for a reorder request.
///
/// `ordered_ids` must be exactly the active tier ids, each once. Returns
/// `None` when every tier already sits at its requested position.
pub(crate) fn plan_reorder(
    current: &[PricingTier],
    ordered_ids: &[Uuid],
) -> Result<Option<Vec<(Uuid, i32)>>, PricingError> {
    if ordered_ids.len() != current.len() {
        return Err(PricingError::invalid(
            "ordered_ids",
            format!(
                "expected all {} active tier ids, got {}",
                current.len(),
                ordered_ids.len()
            ),
        ));
    }

    let mut seen = HashSet::with_capacity(ordered_ids.len());
    for id in ordered_ids {
        if !seen.insert(*id) {
            return Err(PricingError::invalid(
                "ordered_ids",
                format!("tier {} listed more than once", id),
            ));
        }
        if !current.iter().any(|t| t.id == *id) {
            return Err(PricingError::invalid(
                "ordered_ids",
                format!("tier {} is not an active tier of this listing", id),
            ));
        }
    }

    let assignments: Vec<(Uuid, i32)> = ordered_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| (*id, idx as i32 + 1))
        .collect();

    let unchanged = assignments
        .iter()
        .all(|(id, order)| current.iter().any(|t| t.id == *id && t.tier_order == *order));

    Ok(if unchanged { None } else { Some(assignments) })
}

fn check_version(expected: Option<i64>, actual: i64) -> Result<(), PricingError> {
    match expected {
        Some(expected) if expected != actual => {
            Err(PricingError::VersionConflict { expected, actual })
        }
        _ => Ok(()),
    }
}

/// PostgreSQL-backed tier store
#[derive(Debug, Clone)]
pub struct PgTierStore {
    pool: PgPool,
}

impl PgTierStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TierStore for PgTierStore {
    async fn listing_pricing(&self, listing_id: Uuid) -> Result<Option<ListingPricing>, PricingError> {
        queries::fetch_listing_pricing(&self.pool, listing_id).await
    }

    async fn active_tiers(&self, listing_id: Uuid) -> Result<Vec<PricingTier>, PricingError> {
        queries::fetch_active_tiers(&self.pool, listing_id).await
    }

    async fn get_tier(&self, tier_id: Uuid) -> Result<Option<PricingTier>, PricingError> {
        queries::fetch_tier(&self.pool, tier_id).await
    }

    async fn insert_tier(
        &self,
        listing_id: Uuid,
        tier_order: i32,
        draft: &TierDraft,
    ) -> Result<WrittenTier, PricingError> {
        let mut tx = self.pool.begin().await?;

        let tiers_version = queries::bump_tiers_version(&mut *tx, listing_id)
            .await?
            .ok_or(PricingError::ListingNotFound(listing_id))?;
        let tier = queries::insert_tier(&mut *tx, Uuid::new_v4(), listing_id, tier_order, draft).await?;

        tx.commit().await?;
        Ok(WrittenTier { tier, tiers_version })
    }

    async fn update_tier(
        &self,
        tier_id: Uuid,
        tier_order: i32,
        draft: &TierDraft,
    ) -> Result<WrittenTier, PricingError> {
        let mut tx = self.pool.begin().await?;

        let tier = queries::update_tier(&mut *tx, tier_id, tier_order, draft)
            .await?
            .ok_or(PricingError::TierNotFound(tier_id))?;
        let tiers_version = queries::bump_tiers_version(&mut *tx, tier.listing_id)
            .await?
            .ok_or(PricingError::ListingNotFound(tier.listing_id))?;

        tx.commit().await?;
        Ok(WrittenTier { tier, tiers_version })
    }

    async fn deactivate_tier(&self, tier_id: Uuid) -> Result<WrittenTier, PricingError> {
        let mut tx = self.pool.begin().await?;

        let tier = queries::deactivate_tier(&mut *tx, tier_id)
            .await?
            .ok_or(PricingError::TierNotFound(tier_id))?;
        let tiers_version = queries::bump_tiers_version(&mut *tx, tier.listing_id)
            .await?
            .ok_or(PricingError::ListingNotFound(tier.listing_id))?;

        tx.commit().await?;
        Ok(WrittenTier { tier, tiers_version })
    }

    async fn apply_ordering(
        &self,
        listing_id: Uuid,
        ordered_ids: &[Uuid],
        expected_version: Option<i64>,
    ) -> Result<ReorderOutcome, PricingError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent reorders of the same listing
        let version = queries::lock_tiers_version(&mut *tx, listing_id)
            .await?
            .ok_or(PricingError::ListingNotFound(listing_id))?;
        let current = queries::fetch_active_tiers(&mut *tx, listing_id).await?;

        let Some(assignments) = plan_reorder(&current, ordered_ids)? else {
            tx.rollback().await?;
            return Ok(ReorderOutcome::Unchanged {
                tiers: current,
                tiers_version: version,
            });
        };
        check_version(expected_version, version)?;

        for (tier_id, tier_order) in assignments {
            queries::set_tier_order(&mut *tx, tier_id, tier_order).await?;
        }
        let tiers_version = queries::bump_tiers_version(&mut *tx, listing_id)
            .await?
            .ok_or(PricingError::ListingNotFound(listing_id))?;
        let tiers = queries::fetch_active_tiers(&mut *tx, listing_id).await?;

        tx.commit().await?;
        Ok(ReorderOutcome::Reordered {
            tiers,
            tiers_version,
        })
    }
}

#[cfg(test)]
pub mod memory {
    //! In-memory `TierStore` for tests.

    use std::collections::HashMap;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;

    use super::*;
    use crate::pricing::models::PricingModel;

    #[derive(Default)]
    struct State {
        listings: HashMap<Uuid, ListingPricing>,
        tiers: Vec<PricingTier>,
        /// Reads fail as if the database were unreachable
        unavailable: bool,
    }

    impl State {
        fn active(&self, listing_id: Uuid) -> Vec<PricingTier> {
            let mut tiers: Vec<PricingTier> = self
                .tiers
                .iter()
                .filter(|t| t.listing_id == listing_id && t.active)
                .cloned()
                .collect();
            tiers.sort_by_key(|t| t.tier_order);
            tiers
        }

        fn check_available(&self) -> Result<(), PricingError> {
            if self.unavailable {
                return Err(PricingError::Storage("pool timed out".to_string()));
            }
            Ok(())
        }

        fn bump(&mut self, listing_id: Uuid) -> Result<i64, PricingError> {
            let listing = self
                .listings
                .get_mut(&listing_id)
                .ok_or(PricingError::ListingNotFound(listing_id))?;
            listing.tiers_version += 1;
            Ok(listing.tiers_version)
        }
    }

    #[derive(Default)]
    pub struct MemoryTierStore {
        state: Mutex<State>,
    }

    impl MemoryTierStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn add_listing(&self, model: PricingModel, base_price: Option<Decimal>) -> Uuid {
            let listing_id = Uuid::new_v4();
            self.state.lock().await.listings.insert(
                listing_id,
                ListingPricing {
                    listing_id,
                    pricing_model: model,
                    base_price,
                    currency: "USD".to_string(),
                    tiers_version: 0,
                },
            );
            listing_id
        }

        /// Insert a tier directly, skipping validation.
        pub async fn seed_tier(&self, listing_id: Uuid, tier_order: i32, draft: TierDraft) -> PricingTier {
            let tier = build_tier(Uuid::new_v4(), listing_id, tier_order, &draft);
            self.state.lock().await.tiers.push(tier.clone());
            tier
        }

        pub async fn set_unavailable(&self, unavailable: bool) {
            self.state.lock().await.unavailable = unavailable;
        }

        pub async fn version(&self, listing_id: Uuid) -> i64 {
            self.state
                .lock()
                .await
                .listings
                .get(&listing_id)
                .map(|l| l.tiers_version)
                .unwrap_or_default()
        }
    }

    fn build_tier(id: Uuid, listing_id: Uuid, tier_order: i32, draft: &TierDraft) -> PricingTier {
        let now = Utc::now();
        PricingTier {
            id,
            listing_id,
            tier_order,
            min_duration_hours: draft.min_duration_hours,
            max_duration_hours: draft.max_duration_hours,
            price_per_unit: draft.price_per_unit,
            unit_type: draft.unit_type,
            description: draft.description.clone(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[async_trait]
    impl TierStore for MemoryTierStore {
        async fn listing_pricing(&self, listing_id: Uuid) -> Result<Option<ListingPricing>, PricingError> {
            let state = self.state.lock().await;
            state.check_available()?;
            Ok(state.listings.get(&listing_id).cloned())
        }

        async fn active_tiers(&self, listing_id: Uuid) -> Result<Vec<PricingTier>, PricingError> {
            let state = self.state.lock().await;
            state.check_available()?;
            Ok(state.active(listing_id))
        }

        async fn get_tier(&self, tier_id: Uuid) -> Result<Option<PricingTier>, PricingError> {
            Ok(self
                .state
                .lock()
                .await
                .tiers
                .iter()
                .find(|t| t.id == tier_id)
                .cloned())
        }

        async fn insert_tier(
            &self,
            listing_id: Uuid,
            tier_order: i32,
            draft: &TierDraft,
        ) -> Result<WrittenTier, PricingError> {
            let mut state = self.state.lock().await;
            let tiers_version = state.bump(listing_id)?;
            let tier = build_tier(Uuid::new_v4(), listing_id, tier_order, draft);
            state.tiers.push(tier.clone());
            Ok(WrittenTier { tier, tiers_version })
        }

        async fn update_tier(
            &self,
            tier_id: Uuid,
            tier_order: i32,
            draft: &TierDraft,
        ) -> Result<WrittenTier, PricingError> {
            let mut state = self.state.lock().await;
            let tier = state
                .tiers
                .iter_mut()
                .find(|t| t.id == tier_id && t.active)
                .ok_or(PricingError::TierNotFound(tier_id))?;
            tier.tier_order = tier_order;
            tier.min_duration_hours = draft.min_duration_hours;
            tier.max_duration_hours = draft.max_duration_hours;
            tier.price_per_unit = draft.price_per_unit;
            tier.unit_type = draft.unit_type;
            tier.description = draft.description.clone();
            tier.updated_at = Utc::now();
            let tier = tier.clone();
            let tiers_version = state.bump(tier.listing_id)?;
            Ok(WrittenTier { tier, tiers_version })
        }

        async fn deactivate_tier(&self, tier_id: Uuid) -> Result<WrittenTier, PricingError> {
            let mut state = self.state.lock().await;
            let tier = state
                .tiers
                .iter_mut()
                .find(|t| t.id == tier_id)
                .ok_or(PricingError::TierNotFound(tier_id))?;
            tier.active = false;
            tier.updated_at = Utc::now();
            let tier = tier.clone();
            let tiers_version = state.bump(tier.listing_id)?;
            Ok(WrittenTier { tier, tiers_version })
        }

        async fn apply_ordering(
            &self,
            listing_id: Uuid,
            ordered_ids: &[Uuid],
            expected_version: Option<i64>,
        ) -> Result<ReorderOutcome, PricingError> {
            let mut state = self.state.lock().await;
            let version = state
                .listings
                .get(&listing_id)
                .map(|l| l.tiers_version)
                .ok_or(PricingError::ListingNotFound(listing_id))?;
            let current = state.active(listing_id);

            let Some(assignments) = plan_reorder(&current, ordered_ids)? else {
                return Ok(ReorderOutcome::Unchanged {
                    tiers: current,
                    tiers_version: version,
                });
            };
            check_version(expected_version, version)?;

            for (tier_id, tier_order) in assignments {
                if let Some(tier) = state.tiers.iter_mut().find(|t| t.id == tier_id) {
                    tier.tier_order = tier_order;
                }
            }
            let tiers_version = state.bump(listing_id)?;

            Ok(ReorderOutcome::Reordered {
                tiers: state.active(listing_id),
                tiers_version,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::pricing::models::UnitType;

    fn tier(order: i32) -> PricingTier {
        PricingTier {
            id: Uuid::new_v4(),
            listing_id: Uuid::nil(),
            tier_order: order,
            min_duration_hours: dec!(0),
            max_duration_hours: None,
            price_per_unit: dec!(1),
            unit_type: UnitType::Flat,
            description: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_reorder_assigns_positions() {
        let current = vec![tier(1), tier(2), tier(3)];
        let ids = vec![current[2].id, current[0].id, current[1].id];
        let plan = plan_reorder(&current, &ids).unwrap().unwrap();
        assert_eq!(plan, vec![(ids[0], 1), (ids[1], 2), (ids[2], 3)]);
    }

    #[test]
    fn test_plan_reorder_detects_noop() {
        let current = vec![tier(1), tier(2)];
        let ids: Vec<Uuid> = current.iter().map(|t| t.id).collect();
        assert!(plan_reorder(&current, &ids).unwrap().is_none());
    }

    #[test]
    fn test_plan_reorder_renumbers_sparse_orders() {
        // Same sequence but orders 10/20 are compacted to 1/2
        let current = vec![tier(10), tier(20)];
        let ids: Vec<Uuid> = current.iter().map(|t| t.id).collect();
        assert!(plan_reorder(&current, &ids).unwrap().is_some());
    }

    #[test]
    fn test_check_version() {
        assert!(check_version(None, 7).is_ok());
        assert!(check_version(Some(7), 7).is_ok());
        assert!(matches!(
            check_version(Some(6), 7),
            Err(PricingError::VersionConflict { expected: 6, actual: 7 })
        ));
    }
}
