//! Request DTOs for pricing API endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::models::TierDraft;
use super::validation::DefaultTierOptions;

/// Request to price a rental window
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub pickup_at: DateTime<Utc>,
    pub dropoff_at: DateTime<Utc>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// Request to reorder a listing's tiers
#[derive(Debug, Deserialize)]
pub struct ReorderTiersRequest {
    pub ordered_ids: Vec<Uuid>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Request to validate a tier set without saving it
#[derive(Debug, Deserialize)]
pub struct ValidateTiersRequest {
    pub tiers: Vec<TierDraft>,
}

/// Request to generate a starting tier set from a daily rate
#[derive(Debug, Deserialize)]
pub struct GenerateDefaultsRequest {
    #[serde(with = "rust_decimal::serde::str")]
    pub base_daily_rate: Decimal,
    #[serde(flatten)]
    pub options: DefaultTierOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_request_defaults_quantity() {
        let req: QuoteRequest = serde_json::from_str(
            r#"{"pickup_at":"2024-06-01T09:00:00Z","dropoff_at":"2024-06-02T15:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(req.quantity, 1);
    }

    #[test]
    fn test_generate_defaults_request_options_are_optional() {
        let req: GenerateDefaultsRequest =
            serde_json::from_str(r#"{"base_daily_rate":"80"}"#).unwrap();
        assert_eq!(req.base_daily_rate, dec!(80));
        assert_eq!(req.options, DefaultTierOptions::default());

        let req: GenerateDefaultsRequest = serde_json::from_str(
            r#"{"base_daily_rate":"80","short_term_multiplier":"2","long_term_discount":"0.1"}"#,
        )
        .unwrap();
        assert_eq!(req.options.short_term_multiplier, dec!(2));
        assert_eq!(req.options.long_term_discount, dec!(0.1));
    }
}
