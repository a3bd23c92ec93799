//! Response DTOs for pricing API endpoints.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::calculators::PriceCalculationResult;
use super::format::{format_breakdown, format_duration, format_money};
use super::models::PricingTier;

/// Money value for JSON responses
#[derive(Debug, Clone, Serialize)]
pub struct MoneyResponse {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
}

/// Human-readable rendering of a quote
#[derive(Debug, Clone, Serialize)]
pub struct QuoteDisplay {
    pub total: String,
    pub unit_price: String,
    pub duration: String,
    pub breakdown: String,
}

/// Response for quote and preview
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub result: PriceCalculationResult,
    pub total: MoneyResponse,
    /// False for error and configuration_error results; never check out on those
    pub billable: bool,
    pub display: QuoteDisplay,
}

impl QuoteResponse {
    pub fn new(result: PriceCalculationResult, currency: &str) -> Self {
        let display = QuoteDisplay {
            total: format_money(result.total_price, currency),
            unit_price: format_money(result.unit_price, currency),
            duration: format_duration(&result.duration),
            breakdown: format_breakdown(&result.breakdown, currency),
        };

        Self {
            total: MoneyResponse {
                amount: result.total_price,
                currency: currency.to_string(),
            },
            billable: result.is_billable(),
            display,
            result,
        }
    }
}

/// Response for the tier listing
#[derive(Debug, Serialize)]
pub struct TierListResponse {
    pub listing_id: Uuid,
    pub tiers_version: i64,
    pub tiers: Vec<PricingTier>,
}

/// Generic pricing error response
#[derive(Debug, Serialize)]
pub struct PricingErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
