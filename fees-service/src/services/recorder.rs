use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::store::{SharedStore, StoreError};
use crate::dtos::ChargeData;
use crate::models::{Fee, Payment, PaymentMetadata, PaymentStatus, PAYMENT_METHOD_PAYSTACK};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    /// A record for this reference already existed; nothing was written.
    AlreadyRecorded,
}

/// Appends immutable payment records.
#[derive(Clone)]
pub struct PaymentRecorder {
    store: SharedStore,
}

impl PaymentRecorder {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn record(&self, payment: Payment) -> Result<RecordOutcome, StoreError> {
        match self.store.insert_payment(&payment).await {
            Ok(()) => {
                tracing::info!(
                    payment_id = %payment.id,
                    fee_id = %payment.fee_id,
                    reference = %payment.reference,
                    amount = %payment.amount,
                    "Payment recorded"
                );
                Ok(RecordOutcome::Created)
            }
            Err(StoreError::Duplicate(reference)) => {
                tracing::info!(reference = %reference, "Payment already recorded by a concurrent delivery");
                Ok(RecordOutcome::AlreadyRecorded)
            }
            Err(e) => Err(e),
        }
    }
}

/// Build the audit record for a charge credited to `fee`.
///
/// Student details come from the charge metadata when present, falling back to
/// the fee record.
pub fn payment_for_charge(
    fee: &Fee,
    charge: &ChargeData,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Payment {
    let metadata = &charge.metadata;

    Payment {
        id: Uuid::new_v4().to_string(),
        fee_id: fee.id.clone(),
        student_id: metadata
            .student_id
            .clone()
            .unwrap_or_else(|| fee.student_id.clone()),
        student_name: metadata
            .student_name
            .clone()
            .or_else(|| fee.student_name.clone())
            .unwrap_or_default(),
        amount,
        payment_method: PAYMENT_METHOD_PAYSTACK.to_string(),
        payment_date: charge.paid_at.unwrap_or(now),
        reference: charge.reference.clone(),
        status: PaymentStatus::Completed,
        metadata: PaymentMetadata {
            paystack_reference: charge.reference.clone(),
            payer_email: charge.payer_email().map(str::to_string),
            channel: charge.channel.clone(),
            discount_applied: metadata.discount_applied,
            discount_amount: metadata.discount_amount,
            coupon_code: metadata.coupon_code.clone(),
        },
        created_at: now,
    }
}
