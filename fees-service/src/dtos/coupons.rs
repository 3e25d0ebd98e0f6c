use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::CouponSnapshot;

#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub amount: Decimal,
}

/// Verdict returned to the payer. Only `message` is ever shown to users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponSnapshot>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub discount_amount: Option<Decimal>,
    pub message: String,
}

impl CouponValidation {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            coupon: None,
            discount_amount: None,
            message: message.into(),
        }
    }

    pub fn applied(coupon: CouponSnapshot, discount_amount: Decimal) -> Self {
        Self {
            valid: true,
            coupon: Some(coupon),
            discount_amount: Some(discount_amount),
            message: "Coupon applied successfully.".to_string(),
        }
    }
}
