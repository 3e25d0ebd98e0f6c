use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Label stored on payment records settled through Paystack.
pub const PAYMENT_METHOD_PAYSTACK: &str = "paystack";

/// Fixed divisor between the provider's minor unit (kobo) and the major unit.
const MINOR_UNITS_PER_MAJOR: u32 = 2;

/// Convert an amount in minor units to major units, exactly.
pub fn minor_to_major(amount: i64) -> Decimal {
    Decimal::new(amount, MINOR_UNITS_PER_MAJOR)
}

/// Immutable audit entry for one successfully processed provider transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    pub fee_id: String,
    pub student_id: String,
    pub student_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_method: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub payment_date: DateTime<Utc>,
    /// Provider transaction reference; unique across all payments.
    pub reference: String,
    pub status: PaymentStatus,
    pub metadata: PaymentMetadata,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Completed,
}

/// Snapshot of the provider and discount context at the time of payment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaymentMetadata {
    pub paystack_reference: String,
    #[serde(default)]
    pub payer_email: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub discount_applied: bool,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount_amount: Option<Decimal>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_kobo_to_naira() {
        assert_eq!(minor_to_major(6000), Decimal::new(60, 0));
        assert_eq!(minor_to_major(1), Decimal::new(1, 2));
        assert_eq!(minor_to_major(123_456), Decimal::new(123_456, 2));
    }
}
