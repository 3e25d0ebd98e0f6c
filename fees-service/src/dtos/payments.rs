use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Payment, PaymentStatus};

/// Request to start a hosted checkout for (part of) a fee.
#[derive(Debug, Deserialize, Validate)]
pub struct InitializePaymentRequest {
    #[validate(length(min = 1))]
    pub fee_id: String,
    #[validate(email)]
    pub email: String,
    /// Amount in major units, before any coupon discount.
    pub amount: Decimal,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitializePaymentResponse {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
}

/// Payment record as exposed over HTTP.
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: String,
    pub fee_id: String,
    pub student_id: String,
    pub student_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_date: String,
    pub reference: String,
    pub status: PaymentStatus,
    pub discount_applied: bool,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount_amount: Option<Decimal>,
    pub created_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            fee_id: p.fee_id,
            student_id: p.student_id,
            student_name: p.student_name,
            amount: p.amount,
            payment_method: p.payment_method,
            payment_date: p.payment_date.to_rfc3339(),
            reference: p.reference,
            status: p.status,
            discount_applied: p.metadata.discount_applied,
            discount_amount: p.metadata.discount_amount,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}
