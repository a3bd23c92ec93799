//! Database queries for the pricing engine.
//!
//! Every query takes a generic executor so the same statement can run
//! against the pool or inside a store transaction.

use sqlx::PgExecutor;
use uuid::Uuid;

use super::models::{ListingPricing, ListingPricingRow, PricingTier, PricingTierRow, TierDraft};
use super::services::PricingError;

const TIER_COLUMNS: &str = r#"
    id, listing_id, tier_order,
    min_duration_hours, max_duration_hours,
    price_per_unit, unit_type, description,
    active, created_at, updated_at
"#;

fn into_tiers(rows: Vec<PricingTierRow>) -> Result<Vec<PricingTier>, PricingError> {
    rows.into_iter().map(PricingTier::try_from).collect()
}

/// Get the pricing settings for a listing
pub async fn fetch_listing_pricing<'e, E>(
    executor: E,
    listing_id: Uuid,
) -> Result<Option<ListingPricing>, PricingError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, ListingPricingRow>(
        r#"
        SELECT listing_id, pricing_model, base_price, currency, tiers_version
        FROM listing_pricing
        WHERE listing_id = $1
        "#,
    )
    .bind(listing_id)
    .fetch_optional(executor)
    .await?;

    row.map(ListingPricing::try_from).transpose()
}

/// Active tiers for a listing, in evaluation order
pub async fn fetch_active_tiers<'e, E>(
    executor: E,
    listing_id: Uuid,
) -> Result<Vec<PricingTier>, PricingError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        SELECT {TIER_COLUMNS}
        FROM pricing_tiers
        WHERE listing_id = $1
          AND active = true
        ORDER BY tier_order ASC, created_at ASC
        "#
    );
    let rows = sqlx::query_as::<_, PricingTierRow>(&sql)
        .bind(listing_id)
        .fetch_all(executor)
        .await?;

    into_tiers(rows)
}

/// Get a single tier, active or not
pub async fn fetch_tier<'e, E>(executor: E, tier_id: Uuid) -> Result<Option<PricingTier>, PricingError>
where
    E: PgExecutor<'e>,
{
    let sql = format!("SELECT {TIER_COLUMNS} FROM pricing_tiers WHERE id = $1");
    let row = sqlx::query_as::<_, PricingTierRow>(&sql)
        .bind(tier_id)
        .fetch_optional(executor)
        .await?;

    row.map(PricingTier::try_from).transpose()
}

pub async fn insert_tier<'e, E>(
    executor: E,
    tier_id: Uuid,
    listing_id: Uuid,
    tier_order: i32,
    draft: &TierDraft,
) -> Result<PricingTier, PricingError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        INSERT INTO pricing_tiers (
            id, listing_id, tier_order,
            min_duration_hours, max_duration_hours,
            price_per_unit, unit_type, description,
            active, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, NOW(), NOW())
        RETURNING {TIER_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, PricingTierRow>(&sql)
        .bind(tier_id)
        .bind(listing_id)
        .bind(tier_order)
        .bind(draft.min_duration_hours)
        .bind(draft.max_duration_hours)
        .bind(draft.price_per_unit)
        .bind(draft.unit_type.as_str())
        .bind(draft.description.as_deref())
        .fetch_one(executor)
        .await?;

    PricingTier::try_from(row)
}

/// Overwrite the editable fields of an active tier
pub async fn update_tier<'e, E>(
    executor: E,
    tier_id: Uuid,
    tier_order: i32,
    draft: &TierDraft,
) -> Result<Option<PricingTier>, PricingError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        UPDATE pricing_tiers
        SET tier_order = $2,
            min_duration_hours = $3,
            max_duration_hours = $4,
            price_per_unit = $5,
            unit_type = $6,
            description = $7,
            updated_at = NOW()
        WHERE id = $1
          AND active = true
        RETURNING {TIER_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, PricingTierRow>(&sql)
        .bind(tier_id)
        .bind(tier_order)
        .bind(draft.min_duration_hours)
        .bind(draft.max_duration_hours)
        .bind(draft.price_per_unit)
        .bind(draft.unit_type.as_str())
        .bind(draft.description.as_deref())
        .fetch_optional(executor)
        .await?;

    row.map(PricingTier::try_from).transpose()
}

/// Soft delete
pub async fn deactivate_tier<'e, E>(executor: E, tier_id: Uuid) -> Result<Option<PricingTier>, PricingError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        UPDATE pricing_tiers
        SET active = false, updated_at = NOW()
        WHERE id = $1
        RETURNING {TIER_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, PricingTierRow>(&sql)
        .bind(tier_id)
        .fetch_optional(executor)
        .await?;

    row.map(PricingTier::try_from).transpose()
}

pub async fn set_tier_order<'e, E>(executor: E, tier_id: Uuid, tier_order: i32) -> Result<(), PricingError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE pricing_tiers
        SET tier_order = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(tier_id)
    .bind(tier_order)
    .execute(executor)
    .await?;

    Ok(())
}

/// Increment the listing's tier-set version, returning the new value.
/// `None` when the listing has no pricing row.
pub async fn bump_tiers_version<'e, E>(executor: E, listing_id: Uuid) -> Result<Option<i64>, PricingError>
where
    E: PgExecutor<'e>,
{
    let version = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE listing_pricing
        SET tiers_version = tiers_version + 1
        WHERE listing_id = $1
        RETURNING tiers_version
        "#,
    )
    .bind(listing_id)
    .fetch_optional(executor)
    .await?;

    Ok(version)
}

/// Read the tier-set version and hold a row lock until the transaction ends
pub async fn lock_tiers_version<'e, E>(executor: E, listing_id: Uuid) -> Result<Option<i64>, PricingError>
where
    E: PgExecutor<'e>,
{
    let version = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT tiers_version
        FROM listing_pricing
        WHERE listing_id = $1
        FOR UPDATE
        "#,
    )
    .bind(listing_id)
    .fetch_optional(executor)
    .await?;

    Ok(version)
}
