//! Applies successful charges to the fee ledger.
//!
//! Each provider reference is credited at most once. Three layers enforce it:
//! the payment-record lookup (fast path for redeliveries), the fee's own list
//! of applied references checked inside the conditional write, and the unique
//! reference index on payments.
//!
//! Coupon use is counted per reference too, so every path that ends in
//! `AlreadyProcessed` repeats the redemption and a redelivery completes a
//! redemption that an earlier delivery failed to write.

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;

use super::coupons::CouponService;
use super::metrics;
use super::recorder::{payment_for_charge, PaymentRecorder, RecordOutcome};
use super::store::{SharedStore, StoreError};
use crate::config::ReconciliationConfig;
use crate::dtos::ChargeData;
use crate::models::{minor_to_major, Fee, FeeStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    Applied {
        fee_id: String,
        amount: Decimal,
        amount_paid: Decimal,
        balance: Decimal,
        status: FeeStatus,
    },
    /// The reference was already reconciled; nothing changed.
    AlreadyProcessed,
    /// Permanently unusable event data; acknowledged without mutation.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingFeeId,
    FeeNotFound,
    NonPositiveAmount,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingFeeId => "missing_fee_id",
            SkipReason::FeeNotFound => "fee_not_found",
            SkipReason::NonPositiveAmount => "non_positive_amount",
        }
    }
}

/// Transient failures; the webhook caller answers 5xx so the provider redelivers.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("fee {fee_id} was concurrently modified on each of {attempts} attempts")]
    ConflictRetriesExhausted { fee_id: String, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct PaymentReconciler {
    store: SharedStore,
    recorder: PaymentRecorder,
    coupons: CouponService,
    config: ReconciliationConfig,
}

impl PaymentReconciler {
    pub fn new(store: SharedStore, config: ReconciliationConfig) -> Self {
        Self {
            recorder: PaymentRecorder::new(store.clone()),
            coupons: CouponService::new(store.clone()),
            store,
            config,
        }
    }

    #[tracing::instrument(skip(self, charge), fields(reference = %charge.reference, fee_id = tracing::field::Empty))]
    pub async fn reconcile_charge(
        &self,
        charge: &ChargeData,
    ) -> Result<ChargeOutcome, ReconcileError> {
        let Some(fee_id) = charge
            .metadata
            .fee_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        else {
            tracing::warn!("Charge has no fee_id in metadata; ignoring");
            return Ok(ChargeOutcome::Skipped(SkipReason::MissingFeeId));
        };
        tracing::Span::current().record("fee_id", fee_id);

        if charge.amount <= 0 {
            tracing::warn!(amount = charge.amount, "Charge amount is not positive; ignoring");
            return Ok(ChargeOutcome::Skipped(SkipReason::NonPositiveAmount));
        }
        let amount = minor_to_major(charge.amount);

        if self
            .store
            .find_payment_by_reference(&charge.reference)
            .await?
            .is_some()
        {
            tracing::info!("Charge already processed; skipping");
            self.redeem_coupon(charge).await?;
            return Ok(ChargeOutcome::AlreadyProcessed);
        }

        let Some(fee) = self.credit_fee(fee_id, &charge.reference, amount).await? else {
            tracing::warn!("Fee not found; ignoring charge");
            return Ok(ChargeOutcome::Skipped(SkipReason::FeeNotFound));
        };

        let payment = payment_for_charge(&fee, charge, amount, Utc::now());
        if self.recorder.record(payment).await? == RecordOutcome::AlreadyRecorded {
            self.redeem_coupon(charge).await?;
            return Ok(ChargeOutcome::AlreadyProcessed);
        }

        metrics::record_payment(charge.amount);
        self.redeem_coupon(charge).await?;

        tracing::info!(
            amount = %amount,
            amount_paid = %fee.amount_paid,
            balance = %fee.balance,
            status = fee.status.as_str(),
            "Charge reconciled"
        );

        Ok(ChargeOutcome::Applied {
            fee_id: fee.id,
            amount,
            amount_paid: fee.amount_paid,
            balance: fee.balance,
            status: fee.status,
        })
    }

    /// Credit `amount` to the fee with an optimistic read-compute-write loop.
    ///
    /// Returns the fee as it stands after the credit, or `None` if it does not
    /// exist. A fee that already lists `reference` is returned unchanged: an
    /// earlier delivery credited it but did not get as far as the payment record.
    async fn credit_fee(
        &self,
        fee_id: &str,
        reference: &str,
        amount: Decimal,
    ) -> Result<Option<Fee>, ReconcileError> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let Some(mut fee) = self.store.get_fee(fee_id).await? else {
                return Ok(None);
            };

            if fee.has_applied(reference) {
                tracing::info!("Fee already credited for this reference; completing record");
                return Ok(Some(fee));
            }

            let update = fee.credit(amount, reference, Utc::now());
            match self.store.apply_fee_update(&update).await {
                Ok(()) => {
                    fee.apply(&update);
                    return Ok(Some(fee));
                }
                Err(StoreError::Conflict(_)) if attempt < max_attempts => {
                    tracing::warn!(attempt, "Concurrent fee update detected; retrying");
                    tokio::time::sleep(self.config.retry_delay * attempt).await;
                }
                Err(StoreError::Conflict(_)) => break,
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(attempts = max_attempts, "Gave up crediting fee after repeated conflicts");
        Err(ReconcileError::ConflictRetriesExhausted {
            fee_id: fee_id.to_string(),
            attempts: max_attempts,
        })
    }

    /// Count the coupon use for a discounted charge, keyed by its reference.
    ///
    /// A store failure is returned so the provider redelivers; the payment
    /// itself stays recorded and the next delivery only retries this step.
    async fn redeem_coupon(&self, charge: &ChargeData) -> Result<(), StoreError> {
        if !charge.metadata.discount_applied {
            return Ok(());
        }
        let Some(code) = charge.metadata.coupon_code.as_deref() else {
            tracing::debug!("Discounted charge carries no coupon code");
            return Ok(());
        };

        if let Err(e) = self.coupons.record_redemption(code, &charge.reference).await {
            tracing::error!(error = %e, code = %code, "Failed to record coupon redemption");
            return Err(e);
        }
        Ok(())
    }
}
