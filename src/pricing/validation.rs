//! Tier table validation and default-tier generation.
//!
//! Validation checks range coverage, so it orders tiers by
//! `min_duration_hours` rather than `tier_order`. Every violation is reported;
//! nothing short-circuits, so an operator can fix the whole table in one pass.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::calculators::round_money;
use super::models::{PricingTier, TierDraft, UnitType};
use super::services::PricingError;

/// Range and price accessors shared by stored tiers and drafts.
pub trait TierBounds {
    fn min_hours(&self) -> Decimal;
    fn max_hours(&self) -> Option<Decimal>;
    fn price(&self) -> Decimal;
}

impl TierBounds for PricingTier {
    fn min_hours(&self) -> Decimal {
        self.min_duration_hours
    }

    fn max_hours(&self) -> Option<Decimal> {
        self.max_duration_hours
    }

    fn price(&self) -> Decimal {
        self.price_per_unit
    }
}

impl TierBounds for TierDraft {
    fn min_hours(&self) -> Decimal {
        self.min_duration_hours
    }

    fn max_hours(&self) -> Option<Decimal> {
        self.max_duration_hours
    }

    fn price(&self) -> Decimal {
        self.price_per_unit
    }
}

/// Outcome of [`validate_tiers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Check a tier set for valid ranges, non-negative prices and overlaps.
///
/// Tiers are referred to by 1-based position after sorting by minimum duration.
pub fn validate_tiers<T: TierBounds>(tiers: &[T]) -> TierValidation {
    let mut sorted: Vec<&T> = tiers.iter().collect();
    sorted.sort_by(|a, b| a.min_hours().cmp(&b.min_hours()));

    let mut errors = Vec::new();

    for (idx, tier) in sorted.iter().enumerate() {
        let pos = idx + 1;

        if tier.min_hours() < Decimal::ZERO {
            errors.push(format!("Tier {}: minimum duration cannot be negative", pos));
        }

        if let Some(max) = tier.max_hours() {
            if max <= tier.min_hours() {
                errors.push(format!(
                    "Tier {}: maximum duration must be greater than minimum duration",
                    pos
                ));
            }
        }

        if tier.price() < Decimal::ZERO {
            errors.push(format!("Tier {}: price cannot be negative", pos));
        }

        if idx > 0 {
            let prev = sorted[idx - 1];
            match prev.max_hours() {
                Some(prev_max) if tier.min_hours() < prev_max => errors.push(format!(
                    "Tier {} overlaps with tier {}: starts at {}h before tier {} ends at {}h",
                    pos,
                    idx,
                    tier.min_hours().normalize(),
                    idx,
                    prev_max.normalize()
                )),
                // An open-ended tier extends past every later start
                None => errors.push(format!(
                    "Tier {} overlaps with tier {}: tier {} has no maximum duration",
                    pos, idx, idx
                )),
                _ => {}
            }
        }
    }

    TierValidation {
        valid: errors.is_empty(),
        errors,
    }
}

/// Knobs for [`generate_default_tiers`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultTierOptions {
    /// Markup on the daily rate for rentals of four hours or less
    pub short_term_multiplier: Decimal,
    /// Fractional discount on the daily rate beyond one week
    pub long_term_discount: Decimal,
}

impl Default for DefaultTierOptions {
    fn default() -> Self {
        Self {
            short_term_multiplier: dec!(1.5),
            long_term_discount: dec!(0.15),
        }
    }
}

/// Build a four-tier starting table from a single daily rate.
///
/// | range       | unit | price                          |
/// |-------------|------|--------------------------------|
/// | 0-4h        | flat | `rate * short_term_multiplier` |
/// | 4-24h       | flat | `rate`                         |
/// | 24-168h     | day  | `rate`                         |
/// | 168h+       | day  | `rate * (1 - long_term_discount)` |
///
/// Prices are rounded to cents, half up.
pub fn generate_default_tiers(
    daily_rate: Decimal,
    options: DefaultTierOptions,
) -> Result<Vec<TierDraft>, PricingError> {
    if daily_rate < Decimal::ZERO {
        return Err(PricingError::invalid("daily_rate", "cannot be negative"));
    }
    if options.short_term_multiplier <= Decimal::ZERO {
        return Err(PricingError::invalid(
            "short_term_multiplier",
            "must be greater than zero",
        ));
    }
    if options.long_term_discount < Decimal::ZERO || options.long_term_discount >= Decimal::ONE {
        return Err(PricingError::invalid(
            "long_term_discount",
            "must be at least 0 and less than 1",
        ));
    }

    let too_large = || PricingError::invalid("daily_rate", "too large");
    let short_term = daily_rate
        .checked_mul(options.short_term_multiplier)
        .ok_or_else(too_large)?;
    let long_term = daily_rate
        .checked_mul(Decimal::ONE - options.long_term_discount)
        .ok_or_else(too_large)?;

    let short_term = round_money(short_term, 2);
    let daily = round_money(daily_rate, 2);
    let long_term = round_money(long_term, 2);

    let tier = |order: i32, min: Decimal, max: Option<Decimal>, price: Decimal, unit: UnitType, label: &str| TierDraft {
        tier_order: Some(order),
        min_duration_hours: min,
        max_duration_hours: max,
        price_per_unit: price,
        unit_type: unit,
        description: Some(label.to_string()),
    };

    Ok(vec![
        tier(1, dec!(0), Some(dec!(4)), short_term, UnitType::Flat, "Up to 4 hours"),
        tier(2, dec!(4), Some(dec!(24)), daily, UnitType::Flat, "Up to 1 day"),
        tier(3, dec!(24), Some(dec!(168)), daily, UnitType::Day, "1 to 7 days"),
        tier(4, dec!(168), None, long_term, UnitType::Day, "Weekly rate"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(min: Decimal, max: Option<Decimal>, price: Decimal) -> TierDraft {
        TierDraft {
            tier_order: None,
            min_duration_hours: min,
            max_duration_hours: max,
            price_per_unit: price,
            unit_type: UnitType::Flat,
            description: None,
        }
    }

    // ==================== validate_tiers tests ====================

    #[test]
    fn test_empty_set_is_valid() {
        let result = validate_tiers::<TierDraft>(&[]);
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_contiguous_tiers_are_valid() {
        let tiers = vec![
            draft(dec!(0), Some(dec!(4)), dec!(50)),
            draft(dec!(4), Some(dec!(24)), dec!(80)),
            draft(dec!(24), None, dec!(70)),
        ];
        assert!(validate_tiers(&tiers).valid);
    }

    #[test]
    fn test_gaps_are_allowed() {
        let tiers = vec![
            draft(dec!(0), Some(dec!(4)), dec!(50)),
            draft(dec!(10), Some(dec!(20)), dec!(80)),
        ];
        assert!(validate_tiers(&tiers).valid);
    }

    #[test]
    fn test_overlap_is_detected() {
        let tiers = vec![
            draft(dec!(0), Some(dec!(10)), dec!(1)),
            draft(dec!(5), Some(dec!(15)), dec!(1)),
        ];
        let result = validate_tiers(&tiers);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("Tier 2 overlaps with tier 1"));
    }

    #[test]
    fn test_overlap_detected_regardless_of_input_order() {
        let tiers = vec![
            draft(dec!(5), Some(dec!(15)), dec!(1)),
            draft(dec!(0), Some(dec!(10)), dec!(1)),
        ];
        assert!(!validate_tiers(&tiers).valid);
    }

    #[test]
    fn test_open_ended_tier_before_another_overlaps() {
        let tiers = vec![
            draft(dec!(0), None, dec!(1)),
            draft(dec!(24), Some(dec!(48)), dec!(1)),
        ];
        let result = validate_tiers(&tiers);
        assert!(!result.valid);
        assert!(result.errors[0].contains("no maximum duration"));
    }

    #[test]
    fn test_all_violations_are_collected() {
        let tiers = vec![
            draft(dec!(-1), Some(dec!(-2)), dec!(-5)),
            draft(dec!(8), Some(dec!(8)), dec!(1)),
        ];
        let result = validate_tiers(&tiers);
        assert!(!result.valid);
        // tier 1: negative min, max <= min, negative price; tier 2: max <= min
        assert_eq!(result.errors.len(), 4);
        assert!(result.errors.iter().any(|e| e == "Tier 1: minimum duration cannot be negative"));
        assert!(result.errors.iter().any(|e| e == "Tier 1: price cannot be negative"));
        assert!(result
            .errors
            .iter()
            .any(|e| e == "Tier 2: maximum duration must be greater than minimum duration"));
    }

    #[test]
    fn test_zero_price_is_allowed() {
        let tiers = vec![draft(dec!(0), Some(dec!(1)), dec!(0))];
        assert!(validate_tiers(&tiers).valid);
    }

    // ==================== generate_default_tiers tests ====================

    #[test]
    fn test_default_tiers_layout() {
        let tiers = generate_default_tiers(dec!(80), DefaultTierOptions::default()).unwrap();
        assert_eq!(tiers.len(), 4);

        assert_eq!(tiers[0].price_per_unit, dec!(120.00));
        assert_eq!(tiers[0].unit_type, UnitType::Flat);
        assert_eq!(tiers[0].max_duration_hours, Some(dec!(4)));

        assert_eq!(tiers[1].price_per_unit, dec!(80));
        assert_eq!(tiers[1].unit_type, UnitType::Flat);

        assert_eq!(tiers[2].price_per_unit, dec!(80));
        assert_eq!(tiers[2].unit_type, UnitType::Day);
        assert_eq!(tiers[2].min_duration_hours, dec!(24));
        assert_eq!(tiers[2].max_duration_hours, Some(dec!(168)));

        assert_eq!(tiers[3].price_per_unit, dec!(68.00));
        assert_eq!(tiers[3].unit_type, UnitType::Day);
        assert_eq!(tiers[3].max_duration_hours, None);

        let orders: Vec<_> = tiers.iter().map(|t| t.tier_order).collect();
        assert_eq!(orders, vec![Some(1), Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn test_default_tiers_round_half_up() {
        // 33.33 * 1.5 = 49.995 -> 50.00; 33.33 * 0.85 = 28.3305 -> 28.33
        let tiers = generate_default_tiers(dec!(33.33), DefaultTierOptions::default()).unwrap();
        assert_eq!(tiers[0].price_per_unit, dec!(50.00));
        assert_eq!(tiers[3].price_per_unit, dec!(28.33));
    }

    #[test]
    fn test_default_tiers_custom_options() {
        let options = DefaultTierOptions {
            short_term_multiplier: dec!(2),
            long_term_discount: dec!(0.25),
        };
        let tiers = generate_default_tiers(dec!(100), options).unwrap();
        assert_eq!(tiers[0].price_per_unit, dec!(200));
        assert_eq!(tiers[3].price_per_unit, dec!(75));
    }

    #[test]
    fn test_generated_tiers_always_validate() {
        for rate in [dec!(0), dec!(0.01), dec!(1), dec!(33.33), dec!(80), dec!(12345.67)] {
            for discount in [dec!(0), dec!(0.15), dec!(0.5), dec!(0.99)] {
                let options = DefaultTierOptions {
                    short_term_multiplier: dec!(1.5),
                    long_term_discount: discount,
                };
                let tiers = generate_default_tiers(rate, options).unwrap();
                let result = validate_tiers(&tiers);
                assert!(result.valid, "rate {} discount {}: {:?}", rate, discount, result.errors);
            }
        }
    }

    #[test]
    fn test_long_term_rate_never_exceeds_daily_rate() {
        let tiers = generate_default_tiers(dec!(59.99), DefaultTierOptions::default()).unwrap();
        assert!(tiers[3].price_per_unit <= tiers[2].price_per_unit);
    }

    #[test]
    fn test_generator_rejects_bad_inputs() {
        assert!(generate_default_tiers(dec!(-1), DefaultTierOptions::default()).is_err());

        let bad_multiplier = DefaultTierOptions {
            short_term_multiplier: dec!(0),
            ..DefaultTierOptions::default()
        };
        assert!(generate_default_tiers(dec!(10), bad_multiplier).is_err());

        let bad_discount = DefaultTierOptions {
            long_term_discount: dec!(1),
            ..DefaultTierOptions::default()
        };
        assert!(generate_default_tiers(dec!(10), bad_discount).is_err());
    }

    #[test]
    fn test_generator_rejects_rate_that_overflows() {
        let err = generate_default_tiers(Decimal::MAX, DefaultTierOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            PricingError::InvalidInput { ref field, .. } if field == "daily_rate"
        ));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: DefaultTierOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, DefaultTierOptions::default());
    }
}
