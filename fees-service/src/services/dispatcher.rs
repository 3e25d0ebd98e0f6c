use std::sync::Arc;

use super::metrics;
use super::reconciler::{ChargeOutcome, PaymentReconciler, ReconcileError};
use crate::dtos::{TransferData, WebhookEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Charge(ChargeOutcome),
    TransferAcknowledged,
    /// Authenticated event of a type this service does not act on.
    Ignored,
}

impl DispatchOutcome {
    fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Charge(ChargeOutcome::Applied { .. }) => "applied",
            DispatchOutcome::Charge(ChargeOutcome::AlreadyProcessed) => "duplicate",
            DispatchOutcome::Charge(ChargeOutcome::Skipped(reason)) => reason.as_str(),
            DispatchOutcome::TransferAcknowledged => "acknowledged",
            DispatchOutcome::Ignored => "ignored",
        }
    }
}

/// Routes verified webhook events to their handlers.
#[derive(Clone)]
pub struct EventDispatcher {
    reconciler: Arc<PaymentReconciler>,
}

impl EventDispatcher {
    pub fn new(reconciler: Arc<PaymentReconciler>) -> Self {
        Self { reconciler }
    }

    pub async fn dispatch(&self, event: WebhookEvent) -> Result<DispatchOutcome, ReconcileError> {
        let event_type = event.event_type().to_string();

        let result = match event {
            WebhookEvent::ChargeSuccess(charge) => self
                .reconciler
                .reconcile_charge(&charge)
                .await
                .map(DispatchOutcome::Charge),
            WebhookEvent::TransferSuccess(transfer) => {
                handle_transfer(&transfer);
                Ok(DispatchOutcome::TransferAcknowledged)
            }
            WebhookEvent::Unhandled { event } => {
                tracing::info!(event_type = %event, "Unhandled webhook event acknowledged");
                Ok(DispatchOutcome::Ignored)
            }
        };

        match &result {
            Ok(outcome) => metrics::record_webhook_event(&event_type, outcome.label()),
            Err(_) => metrics::record_webhook_event(&event_type, "error"),
        }

        result
    }
}

// Reversal and refund bookkeeping live outside this service.
fn handle_transfer(transfer: &TransferData) {
    tracing::info!(
        reference = %transfer.reference,
        amount = ?transfer.amount,
        status = ?transfer.status,
        "Transfer succeeded"
    );
}
