//! Checkout initialisation and payment history.

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{
    ChargeMetadata, InitializePaymentRequest, InitializePaymentResponse, PaymentResponse,
};
use crate::models::{normalize_code, FeeStatus};
use crate::services::paystack::{InitializeTransaction, PaystackError};
use crate::startup::AppState;

fn provider_error(err: PaystackError) -> AppError {
    match err {
        PaystackError::NotConfigured => AppError::ServiceUnavailable,
        PaystackError::Timeout => {
            AppError::GatewayTimeout("payment provider did not respond".to_string())
        }
        _ => AppError::BadGateway("payment provider request failed".to_string()),
    }
}

/// `POST /payments/initialize`
///
/// Prices the checkout (applying a coupon when given) and opens a Paystack
/// transaction whose metadata lets the webhook find the fee again.
pub async fn initialize_payment(
    State(state): State<AppState>,
    Json(payload): Json<InitializePaymentRequest>,
) -> Result<Json<InitializePaymentResponse>, AppError> {
    payload.validate()?;

    if payload.amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Amount must be greater than zero"
        )));
    }

    let fee = state
        .store
        .get_fee(&payload.fee_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Fee not found")))?;

    if fee.status == FeeStatus::Paid || payload.amount > fee.balance {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Amount exceeds the outstanding balance"
        )));
    }

    let coupon_code = payload
        .coupon_code
        .as_deref()
        .map(normalize_code)
        .filter(|code| !code.is_empty());

    let discount = match &coupon_code {
        Some(code) => {
            let verdict = state.coupons.validate(code, payload.amount).await?;
            if !verdict.valid {
                return Err(AppError::BadRequest(anyhow::anyhow!(verdict.message)));
            }
            verdict.discount_amount.unwrap_or(Decimal::ZERO)
        }
        None => Decimal::ZERO,
    };

    let payable = payload.amount - discount;
    if payable <= Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Coupon covers the full amount; no payment is required"
        )));
    }

    let amount_minor = payable
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.round().to_i64())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Amount is out of range")))?;

    let discount_applied = discount > Decimal::ZERO;
    let request = InitializeTransaction {
        email: payload.email.clone(),
        amount: amount_minor,
        callback_url: None,
        metadata: ChargeMetadata {
            fee_id: Some(fee.id.clone()),
            student_id: Some(fee.student_id.clone()),
            student_name: fee.student_name.clone(),
            discount_applied,
            discount_amount: discount_applied.then_some(discount),
            coupon_code: coupon_code.filter(|_| discount_applied),
        },
    };

    tracing::info!(
        fee_id = %fee.id,
        amount = %payable,
        discount = %discount,
        "Initializing Paystack transaction"
    );

    let transaction = state
        .paystack
        .initialize_transaction(request)
        .await
        .map_err(|e| {
            tracing::error!(fee_id = %fee.id, error = %e, "Failed to initialize transaction");
            provider_error(e)
        })?;

    Ok(Json(InitializePaymentResponse {
        authorization_url: transaction.authorization_url,
        access_code: transaction.access_code,
        reference: transaction.reference,
        amount: payable,
        discount_amount: discount,
    }))
}

/// `GET /fees/:id/payments`, newest first.
pub async fn list_fee_payments(
    State(state): State<AppState>,
    Path(fee_id): Path<String>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    if state.store.get_fee(&fee_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("Fee not found")));
    }

    let payments = state.store.list_payments_for_fee(&fee_id).await?;
    Ok(Json(payments.into_iter().map(PaymentResponse::from).collect()))
}
