//! Client for the backend's authoritative pricing function.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::calculators::PriceCalculationResult;
use super::services::PricingError;

#[async_trait]
pub trait RemotePricer: Send + Sync {
    /// Ask the backend for the binding price of a rental window.
    async fn quote(
        &self,
        listing_id: Uuid,
        pickup_at: DateTime<Utc>,
        dropoff_at: DateTime<Utc>,
        quantity: i32,
    ) -> Result<PriceCalculationResult, PricingError>;
}

/// Calls the `calculate_rental_price` database function.
#[derive(Debug, Clone)]
pub struct PgRemotePricer {
    pool: PgPool,
    timeout: Duration,
}

impl PgRemotePricer {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl RemotePricer for PgRemotePricer {
    async fn quote(
        &self,
        listing_id: Uuid,
        pickup_at: DateTime<Utc>,
        dropoff_at: DateTime<Utc>,
        quantity: i32,
    ) -> Result<PriceCalculationResult, PricingError> {
        let call = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT calculate_rental_price($1, $2, $3, $4)",
        )
        .bind(listing_id)
        .bind(pickup_at)
        .bind(dropoff_at)
        .bind(quantity)
        .fetch_one(&self.pool);

        let payload = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| PricingError::RemoteTimeout(self.timeout))?
            .map_err(|e| PricingError::Remote(e.to_string()))?;

        decode_remote_quote(payload, pickup_at, dropoff_at, quantity)
    }
}

/// Decode the backend's JSON into a result, rejecting shapes that could not
/// have come from a correct calculation of this request.
pub fn decode_remote_quote(
    payload: serde_json::Value,
    pickup_at: DateTime<Utc>,
    dropoff_at: DateTime<Utc>,
    quantity: i32,
) -> Result<PriceCalculationResult, PricingError> {
    let result: PriceCalculationResult = serde_json::from_value(payload)
        .map_err(|e| PricingError::MalformedResponse(e.to_string()))?;

    if result.quantity != quantity || result.pickup_at != pickup_at || result.dropoff_at != dropoff_at {
        return Err(PricingError::MalformedResponse(format!(
            "remote quote is for {} x [{}, {}), requested {} x [{}, {})",
            result.quantity, result.pickup_at, result.dropoff_at, quantity, pickup_at, dropoff_at
        )));
    }

    if result.total_price < Decimal::ZERO || result.unit_price < Decimal::ZERO {
        return Err(PricingError::MalformedResponse(format!(
            "negative price in remote quote: total {}, unit {}",
            result.total_price, result.unit_price
        )));
    }
    if result.quantity <= 0 {
        return Err(PricingError::MalformedResponse(format!(
            "non-positive quantity in remote quote: {}",
            result.quantity
        )));
    }

    Ok(result)
}

#[cfg(test)]
pub mod testing {
    //! Scripted remote pricer.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    pub struct ScriptedRemote {
        response: Result<PriceCalculationResult, PricingError>,
        calls: AtomicUsize,
    }

    impl ScriptedRemote {
        pub fn returning(result: PriceCalculationResult) -> Self {
            Self {
                response: Ok(result),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(err: PricingError) -> Self {
            Self {
                response: Err(err),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemotePricer for ScriptedRemote {
        async fn quote(
            &self,
            _listing_id: Uuid,
            _pickup_at: DateTime<Utc>,
            _dropoff_at: DateTime<Utc>,
            _quantity: i32,
        ) -> Result<PriceCalculationResult, PricingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }
}
