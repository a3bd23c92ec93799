//! Pricing service functions with storage and remote access.
//!
//! Quotes: `calculate_rental_price` asks the backend for the authoritative
//! price, `preview_rental_price` runs the local engine against cached tiers.
//! Tier management: every create/update is validated against the listing's
//! resulting tier set before it is written.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::AppCache;

use super::calculators::{quote_locally, PriceBreakdown, PriceCalculationResult, RateSource};
use super::models::{ListingPricing, PricingModel, PricingTier, TierDraft};
use super::remote::RemotePricer;
use super::store::{ReorderOutcome, TierStore};
use super::validation::validate_tiers;

/// Pricing error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum PricingError {
    #[error("No pricing tier covers a rental of {duration_hours} hours")]
    NoMatchingTier { duration_hours: i64 },

    #[error("Configuration error: {message}")]
    Configuration { message: String, errors: Vec<String> },

    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("No pricing settings for listing {0}")]
    ListingNotFound(Uuid),

    #[error("Pricing tier not found: {0}")]
    TierNotFound(Uuid),

    #[error("Tier set has changed: expected version {expected}, found {actual}")]
    VersionConflict { expected: i64, actual: i64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Remote pricing unavailable: {0}")]
    Remote(String),

    #[error("Remote pricing timed out after {0:?}")]
    RemoteTimeout(Duration),

    #[error("Malformed pricing data: {0}")]
    MalformedResponse(String),
}

impl PricingError {
    pub fn configuration(message: impl Into<String>) -> Self {
        PricingError::Configuration {
            message: message.into(),
            errors: vec![],
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        PricingError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Errors that mean the listing's pricing setup cannot produce a price.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PricingError::Configuration { .. } | PricingError::NoMatchingTier { .. }
        )
    }

    /// Short machine-readable tag for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            PricingError::NoMatchingTier { .. } => "no_matching_tier",
            PricingError::Configuration { .. } => "configuration_error",
            PricingError::InvalidInput { .. } => "invalid_input",
            PricingError::ListingNotFound(_) => "listing_not_found",
            PricingError::TierNotFound(_) => "tier_not_found",
            PricingError::VersionConflict { .. } => "version_conflict",
            PricingError::Storage(_) => "storage_error",
            PricingError::Remote(_) => "remote_error",
            PricingError::RemoteTimeout(_) => "remote_timeout",
            PricingError::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl From<sqlx::Error> for PricingError {
    fn from(err: sqlx::Error) -> Self {
        PricingError::Storage(err.to_string())
    }
}

/// Result of a validated tier write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TierWriteOutcome {
    Applied {
        tier: PricingTier,
        tiers_version: i64,
    },
    /// Nothing was written; the listing's tiers would have been invalid
    Rejected { errors: Vec<String> },
}

// ==================== Quotes ====================

/// Get the authoritative price for a rental from the backend.
///
/// Never fabricates a price: when the remote call fails, times out or returns
/// malformed data, the result carries an `error` breakdown and a zero total.
/// No retry happens here.
pub async fn calculate_rental_price(
    remote: &dyn RemotePricer,
    listing_id: Uuid,
    pickup_at: DateTime<Utc>,
    dropoff_at: DateTime<Utc>,
    quantity: i32,
) -> PriceCalculationResult {
    if quantity <= 0 {
        return PriceCalculationResult::configuration_error(
            pickup_at,
            dropoff_at,
            quantity,
            PricingError::invalid("quantity", "must be a positive integer").to_string(),
        );
    }

    match remote
        .quote(listing_id, pickup_at, dropoff_at, quantity)
        .await
    {
        Ok(result) => {
            debug!(
                %listing_id,
                total = %result.total_price,
                model = result.breakdown.model(),
                "Remote quote received"
            );
            result
        }
        Err(e) => {
            warn!(%listing_id, error = %e, "Remote quote failed");
            PriceCalculationResult::error(pickup_at, dropoff_at, quantity, e.to_string())
        }
    }
}

/// Price a rental locally for instant feedback.
///
/// Configuration problems (no base price, no covering tier) come back as a
/// `configuration_error` result; only lookup failures are errors.
pub async fn preview_rental_price(
    store: &dyn TierStore,
    cache: &AppCache,
    listing_id: Uuid,
    pickup_at: DateTime<Utc>,
    dropoff_at: DateTime<Utc>,
    quantity: i32,
) -> Result<PriceCalculationResult, PricingError> {
    let listing = get_listing_pricing(store, cache, listing_id).await?;

    let result = match listing.pricing_model {
        PricingModel::Tiered => {
            let tiers = get_pricing_tiers(store, cache, listing_id).await?;
            quote_locally(
                PricingModel::Tiered,
                RateSource::Tiers(&tiers),
                pickup_at,
                dropoff_at,
                quantity,
            )
        }
        model => match listing.base_price {
            Some(rate) => quote_locally(model, RateSource::Base(rate), pickup_at, dropoff_at, quantity),
            None => PriceCalculationResult::configuration_error(
                pickup_at,
                dropoff_at,
                quantity,
                format!("{} pricing requires a base price", model),
            ),
        },
    };

    if let PriceBreakdown::ConfigurationError { message } = &result.breakdown {
        info!(%listing_id, %message, "Preview blocked by pricing configuration");
    }

    Ok(result)
}

// ==================== Reads ====================

/// Pricing settings for a listing, through the cache.
pub async fn get_listing_pricing(
    store: &dyn TierStore,
    cache: &AppCache,
    listing_id: Uuid,
) -> Result<ListingPricing, PricingError> {
    if let Some(cached) = cache.listings.get(&listing_id).await {
        debug!(%listing_id, "Cache HIT for listing pricing");
        return Ok((*cached).clone());
    }

    debug!(%listing_id, "Cache MISS for listing pricing");
    let epoch = cache.epoch();
    let listing = store
        .listing_pricing(listing_id)
        .await?
        .ok_or(PricingError::ListingNotFound(listing_id))?;
    cache.put_listing(listing_id, Arc::new(listing.clone()), epoch).await;

    Ok(listing)
}

/// Active tiers for a listing ordered by `tier_order`, through the cache.
pub async fn get_pricing_tiers(
    store: &dyn TierStore,
    cache: &AppCache,
    listing_id: Uuid,
) -> Result<Vec<PricingTier>, PricingError> {
    if let Some(cached) = cache.tiers.get(&listing_id).await {
        debug!(%listing_id, "Cache HIT for pricing tiers");
        return Ok((*cached).clone());
    }

    debug!(%listing_id, "Cache MISS for pricing tiers");
    let epoch = cache.epoch();
    let tiers = store.active_tiers(listing_id).await?;
    cache.put_tiers(listing_id, Arc::new(tiers.clone()), epoch).await;

    Ok(tiers)
}

// ==================== Writes ====================

/// Add a tier to a listing.
///
/// Without an explicit `tier_order` the tier goes after the current last one.
pub async fn create_tier(
    store: &dyn TierStore,
    cache: &AppCache,
    listing_id: Uuid,
    draft: TierDraft,
) -> Result<TierWriteOutcome, PricingError> {
    if store.listing_pricing(listing_id).await?.is_none() {
        return Err(PricingError::ListingNotFound(listing_id));
    }

    let current = store.active_tiers(listing_id).await?;

    let mut candidate: Vec<TierDraft> = current.iter().map(PricingTier::to_draft).collect();
    candidate.push(draft.clone());
    if let Some(rejected) = reject_if_invalid(listing_id, &candidate) {
        return Ok(rejected);
    }

    let tier_order = draft
        .tier_order
        .unwrap_or_else(|| current.iter().map(|t| t.tier_order).max().unwrap_or(0) + 1);

    let written = store.insert_tier(listing_id, tier_order, &draft).await?;
    cache.invalidate_listing(listing_id).await;

    info!(
        %listing_id,
        tier_id = %written.tier.id,
        tier_order,
        version = written.tiers_version,
        "Pricing tier created"
    );

    Ok(TierWriteOutcome::Applied {
        tier: written.tier,
        tiers_version: written.tiers_version,
    })
}

/// Replace a tier's editable fields. A missing `tier_order` keeps the current one.
pub async fn update_tier(
    store: &dyn TierStore,
    cache: &AppCache,
    tier_id: Uuid,
    draft: TierDraft,
) -> Result<TierWriteOutcome, PricingError> {
    let existing = store
        .get_tier(tier_id)
        .await?
        .ok_or(PricingError::TierNotFound(tier_id))?;
    if !existing.active {
        return Err(PricingError::invalid(
            "tier_id",
            "tier has been deactivated and cannot be edited",
        ));
    }

    let listing_id = existing.listing_id;
    let current = store.active_tiers(listing_id).await?;

    let candidate: Vec<TierDraft> = current
        .iter()
        .map(|t| {
            if t.id == tier_id {
                draft.clone()
            } else {
                t.to_draft()
            }
        })
        .collect();
    if let Some(rejected) = reject_if_invalid(listing_id, &candidate) {
        return Ok(rejected);
    }

    let tier_order = draft.tier_order.unwrap_or(existing.tier_order);
    let written = store.update_tier(tier_id, tier_order, &draft).await?;
    cache.invalidate_listing(listing_id).await;

    info!(
        %listing_id,
        %tier_id,
        version = written.tiers_version,
        "Pricing tier updated"
    );

    Ok(TierWriteOutcome::Applied {
        tier: written.tier,
        tiers_version: written.tiers_version,
    })
}

/// Soft-delete a tier. Deactivated tiers stay in storage for historical quotes.
pub async fn deactivate_tier(
    store: &dyn TierStore,
    cache: &AppCache,
    tier_id: Uuid,
) -> Result<TierWriteOutcome, PricingError> {
    let written = store.deactivate_tier(tier_id).await?;
    let listing_id = written.tier.listing_id;
    cache.invalidate_listing(listing_id).await;

    info!(
        %listing_id,
        %tier_id,
        version = written.tiers_version,
        "Pricing tier deactivated"
    );

    Ok(TierWriteOutcome::Applied {
        tier: written.tier,
        tiers_version: written.tiers_version,
    })
}

/// Rewrite `tier_order` to follow `ordered_ids` (1, 2, 3, ...).
///
/// Applied atomically by the store. Repeating a reorder that already took
/// effect returns `Unchanged`, so callers can retry safely. When
/// `expected_version` is given and the tier set has moved on, the reorder is
/// refused with `VersionConflict`.
pub async fn reorder_tiers(
    store: &dyn TierStore,
    cache: &AppCache,
    listing_id: Uuid,
    ordered_ids: &[Uuid],
    expected_version: Option<i64>,
) -> Result<ReorderOutcome, PricingError> {
    let outcome = store
        .apply_ordering(listing_id, ordered_ids, expected_version)
        .await?;

    match &outcome {
        ReorderOutcome::Reordered { tiers_version, .. } => {
            cache.invalidate_listing(listing_id).await;
            info!(%listing_id, version = tiers_version, "Pricing tiers reordered");
        }
        ReorderOutcome::Unchanged { tiers_version, .. } => {
            debug!(%listing_id, version = tiers_version, "Reorder matched current order");
        }
    }

    Ok(outcome)
}

fn reject_if_invalid(listing_id: Uuid, candidate: &[TierDraft]) -> Option<TierWriteOutcome> {
    let validation = validate_tiers(candidate);
    if validation.valid {
        return None;
    }

    info!(
        %listing_id,
        errors = validation.errors.len(),
        "Tier write rejected by validation"
    );
    Some(TierWriteOutcome::Rejected {
        errors: validation.errors,
    })
}
