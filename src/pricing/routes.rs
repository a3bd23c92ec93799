//! Pricing route handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::AppState;

use super::calculators::PriceCalculationResult;
use super::models::TierDraft;
use super::requests::{GenerateDefaultsRequest, QuoteRequest, ReorderTiersRequest, ValidateTiersRequest};
use super::responses::{QuoteResponse, TierListResponse};
use super::services::{self, PricingError, TierWriteOutcome};
use super::store::ReorderOutcome;
use super::validation::{generate_default_tiers, validate_tiers, TierValidation};

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// Currency for error quotes issued before the listing could be read
const FALLBACK_CURRENCY: &str = "USD";

/// Routes mounted under `/api/pricing`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/listings/:id/quote", post(quote))
        .route("/listings/:id/preview", post(preview))
        .route("/listings/:id/tiers", get(list_tiers).post(create_tier))
        .route("/listings/:id/tiers/order", put(reorder_tiers))
        .route("/tiers/validate", post(validate))
        .route("/tiers/defaults", post(defaults))
        .route("/tiers/:tier_id", put(update_tier).delete(deactivate_tier))
}

/// Rejected writes are reported with the validation messages and 422
fn write_status(outcome: &TierWriteOutcome, applied: StatusCode) -> StatusCode {
    match outcome {
        TierWriteOutcome::Applied { .. } => applied,
        TierWriteOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Authoritative quote from the backend
pub async fn quote(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    payload: JsonBody<QuoteRequest>,
) -> Result<Json<QuoteResponse>> {
    let Json(req) = payload?;
    let listing = match services::get_listing_pricing(state.store.as_ref(), &state.cache, listing_id).await {
        Ok(listing) => listing,
        Err(e @ PricingError::ListingNotFound(_)) => return Err(e.into()),
        Err(e) => {
            warn!(%listing_id, error = %e, "Listing lookup failed; returning error quote");
            let result = PriceCalculationResult::error(req.pickup_at, req.dropoff_at, req.quantity, e.to_string());
            return Ok(Json(QuoteResponse::new(result, FALLBACK_CURRENCY)));
        }
    };

    let result = services::calculate_rental_price(
        state.remote.as_ref(),
        listing_id,
        req.pickup_at,
        req.dropoff_at,
        req.quantity,
    )
    .await;

    Ok(Json(QuoteResponse::new(result, &listing.currency)))
}

/// Local, non-binding estimate
pub async fn preview(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    payload: JsonBody<QuoteRequest>,
) -> Result<Json<QuoteResponse>> {
    let Json(req) = payload?;
    let listing = services::get_listing_pricing(state.store.as_ref(), &state.cache, listing_id).await?;

    let result = services::preview_rental_price(
        state.store.as_ref(),
        &state.cache,
        listing_id,
        req.pickup_at,
        req.dropoff_at,
        req.quantity,
    )
    .await?;

    Ok(Json(QuoteResponse::new(result, &listing.currency)))
}

pub async fn list_tiers(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<TierListResponse>> {
    let listing = services::get_listing_pricing(state.store.as_ref(), &state.cache, listing_id).await?;
    let tiers = services::get_pricing_tiers(state.store.as_ref(), &state.cache, listing_id).await?;

    Ok(Json(TierListResponse {
        listing_id,
        tiers_version: listing.tiers_version,
        tiers,
    }))
}

pub async fn create_tier(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    payload: JsonBody<TierDraft>,
) -> Result<(StatusCode, Json<TierWriteOutcome>)> {
    let Json(draft) = payload?;
    let outcome = services::create_tier(state.store.as_ref(), &state.cache, listing_id, draft).await?;

    Ok((write_status(&outcome, StatusCode::CREATED), Json(outcome)))
}

pub async fn update_tier(
    State(state): State<AppState>,
    Path(tier_id): Path<Uuid>,
    payload: JsonBody<TierDraft>,
) -> Result<(StatusCode, Json<TierWriteOutcome>)> {
    let Json(draft) = payload?;
    let outcome = services::update_tier(state.store.as_ref(), &state.cache, tier_id, draft).await?;

    Ok((write_status(&outcome, StatusCode::OK), Json(outcome)))
}

pub async fn deactivate_tier(
    State(state): State<AppState>,
    Path(tier_id): Path<Uuid>,
) -> Result<Json<TierWriteOutcome>> {
    let outcome = services::deactivate_tier(state.store.as_ref(), &state.cache, tier_id).await?;
    Ok(Json(outcome))
}

pub async fn reorder_tiers(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    payload: JsonBody<ReorderTiersRequest>,
) -> Result<Json<ReorderOutcome>> {
    let Json(req) = payload?;
    let outcome = services::reorder_tiers(
        state.store.as_ref(),
        &state.cache,
        listing_id,
        &req.ordered_ids,
        req.expected_version,
    )
    .await?;

    Ok(Json(outcome))
}

/// Dry-run validation of a tier table
pub async fn validate(payload: JsonBody<ValidateTiersRequest>) -> Result<Json<TierValidation>> {
    let Json(req) = payload?;
    Ok(Json(validate_tiers(&req.tiers)))
}

/// Suggested starting tiers; nothing is saved
pub async fn defaults(payload: JsonBody<GenerateDefaultsRequest>) -> Result<Json<Vec<TierDraft>>> {
    let Json(req) = payload?;
    let tiers = generate_default_tiers(req.base_daily_rate, req.options)?;
    Ok(Json(tiers))
}
