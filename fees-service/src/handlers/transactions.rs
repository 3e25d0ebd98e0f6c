//! Transaction verification proxy.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::services::paystack::PaystackError;
use crate::startup::AppState;

const MAX_REFERENCE_LEN: usize = 100;

fn is_valid_reference(reference: &str) -> bool {
    !reference.is_empty()
        && reference.len() <= MAX_REFERENCE_LEN
        && reference
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'=' | b'-'))
}

/// `GET /payments/verify/:reference`
///
/// Returns Paystack's verification JSON with Paystack's own status code.
/// Nothing is written locally; fee updates only happen through the webhook.
pub async fn verify_transaction(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let reference = reference.trim();
    if !is_valid_reference(reference) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Invalid transaction reference"
        )));
    }

    let response = state
        .paystack
        .verify_transaction(reference)
        .await
        .map_err(|e| {
            tracing::error!(reference = %reference, error = %e, "Transaction verification failed");
            match e {
                PaystackError::Timeout => {
                    AppError::GatewayTimeout("payment provider did not respond".to_string())
                }
                PaystackError::NotConfigured => AppError::ServiceUnavailable,
                _ => AppError::BadGateway("payment provider request failed".to_string()),
            }
        })?;

    if !response.status.is_success() {
        tracing::warn!(reference = %reference, status = %response.status, "Paystack rejected verification");
    }

    Ok((response.status, Json(response.body)))
}

/// `GET /payments/verify` with no reference.
pub async fn missing_reference() -> AppError {
    AppError::BadRequest(anyhow::anyhow!("Transaction reference is required"))
}
