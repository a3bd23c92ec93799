//! Error handling for the HTTP layer

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::pricing::responses::PricingErrorResponse;
use crate::pricing::PricingError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Invalid request body: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Pricing(e) => match e {
                PricingError::ListingNotFound(_) | PricingError::TierNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                PricingError::VersionConflict { .. } => StatusCode::CONFLICT,
                PricingError::NoMatchingTier { .. }
                | PricingError::Configuration { .. }
                | PricingError::InvalidInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                PricingError::Remote(_)
                | PricingError::RemoteTimeout(_)
                | PricingError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
                PricingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> PricingErrorResponse {
        match self {
            AppError::BadRequest(msg) => PricingErrorResponse {
                error_type: "bad_request".to_string(),
                message: msg.clone(),
                details: None,
            },
            // Storage details stay in the logs
            AppError::Pricing(PricingError::Storage(_)) => PricingErrorResponse {
                error_type: "storage_error".to_string(),
                message: "Database error".to_string(),
                details: None,
            },
            AppError::Pricing(e) => {
                let details = match e {
                    PricingError::Configuration { errors, .. } if !errors.is_empty() => {
                        Some(json!({ "errors": errors }))
                    }
                    PricingError::VersionConflict { expected, actual } => {
                        Some(json!({ "expected": expected, "actual": actual }))
                    }
                    PricingError::InvalidInput { field, .. } => Some(json!({ "field": field })),
                    _ => None,
                };
                PricingErrorResponse {
                    error_type: e.kind().to_string(),
                    message: e.to_string(),
                    details,
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(self.body())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
