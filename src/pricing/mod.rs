//! Rental pricing engine.
//!
//! Computes rental prices from a listing's pricing model and duration tiers,
//! manages tier tables, and fronts the backend's authoritative quote function.
//! The local calculator is a preview; the remote quote is what gets charged.

pub mod calculators;
pub mod format;
pub mod models;
pub mod queries;
pub mod remote;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;
pub mod store;
pub mod validation;

// Re-export commonly used items
pub use calculators::{
    calculate_price, normalize, quote_locally, resolve_tier, round_money, PriceBreakdown,
    PriceCalculation, PriceCalculationResult, RateSource, RentalDuration,
};
pub use models::{ListingPricing, PricingModel, PricingTier, TierDraft, UnitType};
pub use remote::{PgRemotePricer, RemotePricer};
pub use routes::router;
pub use services::{PricingError, TierWriteOutcome};
pub use store::{PgTierStore, ReorderOutcome, TierStore};
pub use validation::{generate_default_tiers, validate_tiers, DefaultTierOptions, TierValidation};
