//! Paystack webhook receiver.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use service_core::error::AppError;

use crate::dtos::{EventParseError, WebhookAck, WebhookEvent};
use crate::services::metrics;
use crate::services::paystack::SIGNATURE_HEADER;
use crate::startup::AppState;

/// Receive a Paystack event.
///
/// The signature is checked against the raw body before anything is parsed.
/// Every authenticated event is acknowledged with `{"received": true}` unless
/// reconciliation hits a transient storage failure, which is answered with a
/// 500 so Paystack redelivers.
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if !state.paystack.verify_webhook_signature(&body, signature) {
        metrics::record_webhook_event("unknown", "unauthorized");
        return Err(AppError::Unauthorized(anyhow::anyhow!("Invalid signature")));
    }

    let event = match WebhookEvent::from_slice(&body) {
        Ok(event) => event,
        Err(EventParseError::Envelope(e)) => {
            tracing::warn!(error = %e, "Rejecting webhook with malformed envelope");
            return Err(AppError::BadRequest(anyhow::anyhow!("Invalid webhook payload")));
        }
        Err(EventParseError::Payload { event, source }) => {
            // Redelivery would carry the same data; acknowledge to stop retries.
            tracing::error!(event_type = %event, error = %source, "Malformed event data; acknowledging without processing");
            metrics::record_webhook_event(&event, "malformed");
            return Ok(Json(WebhookAck::received()));
        }
    };

    let event_type = event.event_type().to_string();
    tracing::info!(event_type = %event_type, "Processing Paystack webhook");

    match state.dispatcher.dispatch(event).await {
        Ok(outcome) => {
            tracing::debug!(event_type = %event_type, outcome = ?outcome, "Webhook handled");
            Ok(Json(WebhookAck::received()))
        }
        Err(e) => {
            tracing::error!(event_type = %event_type, error = %e, "Webhook processing failed; provider will retry");
            Err(AppError::InternalError(e.into()))
        }
    }
}
