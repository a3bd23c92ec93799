//! Pricing domain types and database rows.
//!
//! Rows use sqlx's FromRow derive for direct database deserialization and are
//! converted into typed domain values before any pricing logic sees them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::services::PricingError;

/// Which computation path applies to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    Flat,
    PerHour,
    PerDay,
    Tiered,
}

impl PricingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingModel::Flat => "flat",
            PricingModel::PerHour => "per_hour",
            PricingModel::PerDay => "per_day",
            PricingModel::Tiered => "tiered",
        }
    }
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricingModel {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(PricingModel::Flat),
            "per_hour" => Ok(PricingModel::PerHour),
            "per_day" => Ok(PricingModel::PerDay),
            "tiered" => Ok(PricingModel::Tiered),
            other => Err(PricingError::MalformedResponse(format!(
                "unknown pricing model '{}'",
                other
            ))),
        }
    }
}

/// How a tier's `price_per_unit` is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Charged once regardless of duration
    Flat,
    /// Multiplied by billable hours
    Hour,
    /// Multiplied by billable days
    Day,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Flat => "flat",
            UnitType::Hour => "hour",
            UnitType::Day => "day",
        }
    }
}

impl FromStr for UnitType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(UnitType::Flat),
            "hour" => Ok(UnitType::Hour),
            "day" => Ok(UnitType::Day),
            other => Err(PricingError::MalformedResponse(format!(
                "unknown unit type '{}'",
                other
            ))),
        }
    }
}

/// One row of a listing's duration-based price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTier {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub tier_order: i32,
    pub min_duration_hours: Decimal,
    /// Inclusive upper bound; `None` means open-ended
    pub max_duration_hours: Option<Decimal>,
    pub price_per_unit: Decimal,
    pub unit_type: UnitType,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PricingTier {
    /// Whether a duration (in whole hours) falls inside this tier's inclusive range.
    pub fn covers(&self, duration_hours: i64) -> bool {
        let hours = Decimal::from(duration_hours);
        hours >= self.min_duration_hours
            && self.max_duration_hours.map_or(true, |max| hours <= max)
    }

    /// Label used in breakdowns: the description, or the range when unset.
    pub fn label(&self) -> String {
        match &self.description {
            Some(d) if !d.trim().is_empty() => d.clone(),
            _ => super::format::format_tier_range(self.min_duration_hours, self.max_duration_hours),
        }
    }

    /// The editable fields of this tier.
    pub fn to_draft(&self) -> TierDraft {
        TierDraft {
            tier_order: Some(self.tier_order),
            min_duration_hours: self.min_duration_hours,
            max_duration_hours: self.max_duration_hours,
            price_per_unit: self.price_per_unit,
            unit_type: self.unit_type,
            description: self.description.clone(),
        }
    }
}

/// Editable tier fields, used for create/update and by the default-tier generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDraft {
    #[serde(default)]
    pub tier_order: Option<i32>,
    pub min_duration_hours: Decimal,
    #[serde(default)]
    pub max_duration_hours: Option<Decimal>,
    pub price_per_unit: Decimal,
    pub unit_type: UnitType,
    #[serde(default)]
    pub description: Option<String>,
}

/// Per-listing pricing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingPricing {
    pub listing_id: Uuid,
    pub pricing_model: PricingModel,
    /// Unit price for the flat/per_hour/per_day models
    pub base_price: Option<Decimal>,
    pub currency: String,
    /// Bumped on every tier write; used as the reorder version token
    pub tiers_version: i64,
}

/// pricing_tiers row
#[derive(Debug, Clone, FromRow)]
pub struct PricingTierRow {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub tier_order: i32,
    pub min_duration_hours: Decimal,
    pub max_duration_hours: Option<Decimal>,
    pub price_per_unit: Decimal,
    pub unit_type: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PricingTierRow> for PricingTier {
    type Error = PricingError;

    fn try_from(row: PricingTierRow) -> Result<Self, Self::Error> {
        Ok(PricingTier {
            id: row.id,
            listing_id: row.listing_id,
            tier_order: row.tier_order,
            min_duration_hours: row.min_duration_hours,
            max_duration_hours: row.max_duration_hours,
            price_per_unit: row.price_per_unit,
            unit_type: row.unit_type.parse()?,
            description: row.description,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// listing_pricing row
#[derive(Debug, Clone, FromRow)]
pub struct ListingPricingRow {
    pub listing_id: Uuid,
    pub pricing_model: String,
    pub base_price: Option<Decimal>,
    pub currency: String,
    pub tiers_version: i64,
}

impl TryFrom<ListingPricingRow> for ListingPricing {
    type Error = PricingError;

    fn try_from(row: ListingPricingRow) -> Result<Self, Self::Error> {
        Ok(ListingPricing {
            listing_id: row.listing_id,
            pricing_model: row.pricing_model.parse()?,
            base_price: row.base_price,
            currency: row.currency,
            tiers_version: row.tiers_version,
        })
    }
}
