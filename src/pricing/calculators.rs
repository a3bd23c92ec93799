//! Core pricing calculation functions.
//!
//! Pure functions for rental pricing math - no database access. The same
//! algorithm runs server-side in `calculate_rental_price`; results from this
//! module are previews, the remote quote is what gets charged.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{PricingModel, PricingTier, UnitType};
use super::services::PricingError;

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Round to specified decimal places, halves rounding away from zero.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use rental_pricing::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(3));
/// assert_eq!(round_money(dec!(1.005), 2), dec!(1.01));
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Billable duration of a rental window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalDuration {
    /// Elapsed time rounded up to whole hours, never negative
    pub hours: i64,
    /// `ceil(hours / 24)`, floored at 1
    pub days: i64,
}

/// Convert a pickup/dropoff pair into billable hours and days.
///
/// A window that ends at or before it starts bills 0 hours but still one day:
/// every rental costs at least one day-unit.
pub fn normalize(pickup_at: DateTime<Utc>, dropoff_at: DateTime<Utc>) -> RentalDuration {
    let millis = (dropoff_at - pickup_at).num_milliseconds().max(0);
    let hours = (millis + MILLIS_PER_HOUR - 1) / MILLIS_PER_HOUR;
    let days = ((hours + 23) / 24).max(1);

    RentalDuration { hours, days }
}

/// Select the tier that applies to a duration.
///
/// Inactive tiers are skipped and the rest are walked in ascending
/// `tier_order`; the first one whose inclusive range covers the duration wins.
/// This is first-fit, so with overlapping data the order decides, not the
/// tightest range.
pub fn resolve_tier(tiers: &[PricingTier], duration_hours: i64) -> Option<&PricingTier> {
    let mut candidates: Vec<&PricingTier> = tiers.iter().filter(|t| t.active).collect();
    candidates.sort_by_key(|t| t.tier_order);
    candidates.into_iter().find(|t| t.covers(duration_hours))
}

/// Where the unit rate for a calculation comes from.
#[derive(Debug, Clone, Copy)]
pub enum RateSource<'a> {
    /// Listing base price (flat, per_hour, per_day)
    Base(Decimal),
    /// Listing tier table (tiered)
    Tiers(&'a [PricingTier]),
}

/// Structured account of how a price was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum PriceBreakdown {
    Flat {
        rate: Decimal,
        quantity: i32,
        subtotal: Decimal,
    },
    PerHour {
        rate: Decimal,
        hours: i64,
        quantity: i32,
        subtotal: Decimal,
    },
    PerDay {
        rate: Decimal,
        days: i64,
        quantity: i32,
        subtotal: Decimal,
    },
    Tiered {
        tier_id: Uuid,
        tier_label: String,
        unit_type: UnitType,
        rate: Decimal,
        hours: i64,
        days: i64,
        /// How many times `rate` was charged (1, hours or days)
        units: i64,
        unit_price: Decimal,
        quantity: i32,
        subtotal: Decimal,
    },
    /// Pricing is misconfigured for this request; blocks checkout
    ConfigurationError { message: String },
    /// The authoritative quote could not be obtained; display only
    Error { message: String },
}

impl PriceBreakdown {
    /// Tag naming the model (or failure) that produced this breakdown.
    pub fn model(&self) -> &'static str {
        match self {
            PriceBreakdown::Flat { .. } => "flat",
            PriceBreakdown::PerHour { .. } => "per_hour",
            PriceBreakdown::PerDay { .. } => "per_day",
            PriceBreakdown::Tiered { .. } => "tiered",
            PriceBreakdown::ConfigurationError { .. } => "configuration_error",
            PriceBreakdown::Error { .. } => "error",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PriceBreakdown::ConfigurationError { .. } | PriceBreakdown::Error { .. }
        )
    }
}

/// Output of [`calculate_price`].
#[derive(Debug, Clone, PartialEq)]
pub struct PriceCalculation {
    pub total_price: Decimal,
    /// Price for a quantity of one
    pub unit_price: Decimal,
    pub breakdown: PriceBreakdown,
}

fn checked_product(a: Decimal, b: Decimal) -> Result<Decimal, PricingError> {
    a.checked_mul(b)
        .ok_or_else(|| PricingError::configuration("price exceeds the supported range"))
}

/// Compute the price for one rental request.
///
/// `quantity` multiplies only the final subtotal. Totals are exact decimals
/// and are not rounded here.
///
/// # Errors
/// - `InvalidInput` when `quantity` is not positive
/// - `Configuration` when the rate source does not fit the model, a base rate is
///   negative, or the price overflows the decimal range
/// - `NoMatchingTier` when no active tier covers the duration
pub fn calculate_price(
    model: PricingModel,
    rates: RateSource<'_>,
    duration: RentalDuration,
    quantity: i32,
) -> Result<PriceCalculation, PricingError> {
    if quantity <= 0 {
        return Err(PricingError::invalid(
            "quantity",
            "must be a positive integer",
        ));
    }
    let qty = Decimal::from(quantity);

    match (model, rates) {
        (PricingModel::Tiered, RateSource::Tiers(tiers)) => {
            let tier = resolve_tier(tiers, duration.hours).ok_or(PricingError::NoMatchingTier {
                duration_hours: duration.hours,
            })?;

            let units = match tier.unit_type {
                UnitType::Flat => 1,
                UnitType::Hour => duration.hours,
                UnitType::Day => duration.days,
            };
            let unit_price = checked_product(tier.price_per_unit, Decimal::from(units))?;
            let subtotal = checked_product(unit_price, qty)?;

            Ok(PriceCalculation {
                total_price: subtotal,
                unit_price,
                breakdown: PriceBreakdown::Tiered {
                    tier_id: tier.id,
                    tier_label: tier.label(),
                    unit_type: tier.unit_type,
                    rate: tier.price_per_unit,
                    hours: duration.hours,
                    days: duration.days,
                    units,
                    unit_price,
                    quantity,
                    subtotal,
                },
            })
        }
        (PricingModel::Tiered, RateSource::Base(_)) => Err(PricingError::configuration(
            "tiered pricing requires a tier table",
        )),
        (_, RateSource::Tiers(_)) => Err(PricingError::configuration(format!(
            "{} pricing requires a base price",
            model
        ))),
        (_, RateSource::Base(rate)) if rate < Decimal::ZERO => Err(PricingError::configuration(
            format!("base price cannot be negative (got {})", rate),
        )),
        (PricingModel::Flat, RateSource::Base(rate)) => {
            let subtotal = checked_product(rate, qty)?;
            Ok(PriceCalculation {
                total_price: subtotal,
                unit_price: rate,
                breakdown: PriceBreakdown::Flat {
                    rate,
                    quantity,
                    subtotal,
                },
            })
        }
        (PricingModel::PerHour, RateSource::Base(rate)) => {
            let unit_price = checked_product(rate, Decimal::from(duration.hours))?;
            let subtotal = checked_product(unit_price, qty)?;
            Ok(PriceCalculation {
                total_price: subtotal,
                unit_price,
                breakdown: PriceBreakdown::PerHour {
                    rate,
                    hours: duration.hours,
                    quantity,
                    subtotal,
                },
            })
        }
        (PricingModel::PerDay, RateSource::Base(rate)) => {
            let unit_price = checked_product(rate, Decimal::from(duration.days))?;
            let subtotal = checked_product(unit_price, qty)?;
            Ok(PriceCalculation {
                total_price: subtotal,
                unit_price,
                breakdown: PriceBreakdown::PerDay {
                    rate,
                    days: duration.days,
                    quantity,
                    subtotal,
                },
            })
        }
    }
}

/// Result of pricing a rental window, local or remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCalculationResult {
    pub total_price: Decimal,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub duration: RentalDuration,
    pub pickup_at: DateTime<Utc>,
    pub dropoff_at: DateTime<Utc>,
    pub breakdown: PriceBreakdown,
}

impl PriceCalculationResult {
    /// Zero-priced result for a pricing setup that cannot produce a price.
    pub fn configuration_error(
        pickup_at: DateTime<Utc>,
        dropoff_at: DateTime<Utc>,
        quantity: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::failed(
            pickup_at,
            dropoff_at,
            quantity,
            PriceBreakdown::ConfigurationError {
                message: message.into(),
            },
        )
    }

    /// Zero-priced result for a failed authoritative quote.
    pub fn error(
        pickup_at: DateTime<Utc>,
        dropoff_at: DateTime<Utc>,
        quantity: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::failed(
            pickup_at,
            dropoff_at,
            quantity,
            PriceBreakdown::Error {
                message: message.into(),
            },
        )
    }

    fn failed(
        pickup_at: DateTime<Utc>,
        dropoff_at: DateTime<Utc>,
        quantity: i32,
        breakdown: PriceBreakdown,
    ) -> Self {
        PriceCalculationResult {
            total_price: Decimal::ZERO,
            unit_price: Decimal::ZERO,
            quantity,
            duration: normalize(pickup_at, dropoff_at),
            pickup_at,
            dropoff_at,
            breakdown,
        }
    }

    /// Whether this result may be used for checkout.
    pub fn is_billable(&self) -> bool {
        !self.breakdown.is_failure()
    }
}

/// Run the full local quote path: normalize, then calculate.
///
/// Never fails: configuration and input problems come back as a
/// `configuration_error` breakdown with a zero total.
pub fn quote_locally(
    model: PricingModel,
    rates: RateSource<'_>,
    pickup_at: DateTime<Utc>,
    dropoff_at: DateTime<Utc>,
    quantity: i32,
) -> PriceCalculationResult {
    let duration = normalize(pickup_at, dropoff_at);

    match calculate_price(model, rates, duration, quantity) {
        Ok(calc) => PriceCalculationResult {
            total_price: calc.total_price,
            unit_price: calc.unit_price,
            quantity,
            duration,
            pickup_at,
            dropoff_at,
            breakdown: calc.breakdown,
        },
        Err(e) => PriceCalculationResult::configuration_error(
            pickup_at,
            dropoff_at,
            quantity,
            e.to_string(),
        ),
    }
}
