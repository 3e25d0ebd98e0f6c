use chrono::NaiveDate;
use mongodb::bson::Bson;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A discount code. Codes are stored and matched uppercase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    /// Whatever key the admin tooling generated; usually an `ObjectId`.
    #[serde(rename = "_id")]
    pub id: Bson,
    pub code: String,
    pub discount_type: DiscountType,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_value: Decimal,
    pub max_uses: i64,
    #[serde(default)]
    pub used_count: i64,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    pub is_active: bool,
    /// Provider references whose payment has been counted in `used_count`.
    #[serde(default)]
    pub redeemed_references: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
    Free,
}

/// The coupon terms captured at the moment of use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouponSnapshot {
    pub code: String,
    pub discount_type: DiscountType,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_value: Decimal,
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl Coupon {
    pub fn is_exhausted(&self) -> bool {
        self.used_count >= self.max_uses
    }

    /// Expiry is compared by calendar date; a coupon is usable on its expiry day.
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }

    pub fn has_redeemed(&self, reference: &str) -> bool {
        self.redeemed_references.iter().any(|r| r == reference)
    }

    /// Discount for `amount`, rounded to the minor unit and never above `amount`.
    ///
    /// A percentage product too large for `Decimal` falls back to dividing
    /// first; if that still overflows the whole amount is discounted.
    pub fn discount_for(&self, amount: Decimal) -> Decimal {
        let amount = amount.max(Decimal::ZERO);
        let raw = match self.discount_type {
            DiscountType::Percentage => amount
                .checked_mul(self.discount_value)
                .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
                .or_else(|| {
                    (amount / Decimal::ONE_HUNDRED).checked_mul(self.discount_value)
                })
                .unwrap_or(amount),
            DiscountType::Fixed => self.discount_value,
            DiscountType::Free => amount,
        };

        raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .clamp(Decimal::ZERO, amount)
    }

    pub fn snapshot(&self) -> CouponSnapshot {
        CouponSnapshot {
            code: self.code.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
        }
    }
}
