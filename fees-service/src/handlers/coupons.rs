use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use service_core::error::AppError;

use crate::dtos::{CouponValidation, ValidateCouponRequest};
use crate::services::metrics;
use crate::startup::AppState;

const MSG_TRY_AGAIN: &str = "We could not check this coupon right now. Please try again.";

/// `POST /coupons/validate`
///
/// Read-only; safe to call on every keystroke. Storage failures still answer
/// with a verdict body so the checkout form can show `message`.
pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(payload): Json<ValidateCouponRequest>,
) -> Result<(StatusCode, Json<CouponValidation>), AppError> {
    if payload.amount < Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Amount must not be negative"
        )));
    }

    match state.coupons.validate(&payload.code, payload.amount).await {
        Ok(verdict) => {
            metrics::record_coupon_validation(verdict.valid);
            Ok((StatusCode::OK, Json(verdict)))
        }
        Err(e) => {
            tracing::error!(error = %e, "Coupon lookup failed");
            Ok((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(CouponValidation::invalid(MSG_TRY_AGAIN)),
            ))
        }
    }
}
