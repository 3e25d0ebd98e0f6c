//! Coupon validation and redemption.
//!
//! Validation is read-only and repeatable (the checkout form calls it as the
//! payer types); usage is only counted by [`CouponService::record_redemption`]
//! once a discounted payment has actually completed.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use super::store::{CouponRedemption, SharedStore, StoreError};
use crate::dtos::CouponValidation;
use crate::models::normalize_code;

pub const MSG_INVALID: &str = "Invalid coupon code.";
pub const MSG_INACTIVE: &str = "This coupon is inactive.";
pub const MSG_EXHAUSTED: &str = "This coupon has reached its maximum usage limit.";
pub const MSG_EXPIRED: &str = "This coupon has expired.";

#[derive(Clone)]
pub struct CouponService {
    store: SharedStore,
}

impl CouponService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn validate(
        &self,
        code: &str,
        amount: Decimal,
    ) -> Result<CouponValidation, StoreError> {
        self.validate_on(code, amount, Utc::now().date_naive()).await
    }

    /// Checks run in order and stop at the first failure.
    pub async fn validate_on(
        &self,
        code: &str,
        amount: Decimal,
        today: NaiveDate,
    ) -> Result<CouponValidation, StoreError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Ok(CouponValidation::invalid(MSG_INVALID));
        }

        let Some(coupon) = self.store.find_coupon_by_code(&code).await? else {
            tracing::debug!(code = %code, "Coupon not found");
            return Ok(CouponValidation::invalid(MSG_INVALID));
        };

        if !coupon.is_active {
            return Ok(CouponValidation::invalid(MSG_INACTIVE));
        }
        if coupon.is_exhausted() {
            return Ok(CouponValidation::invalid(MSG_EXHAUSTED));
        }
        if coupon.is_expired_on(today) {
            return Ok(CouponValidation::invalid(MSG_EXPIRED));
        }

        let discount = coupon.discount_for(amount);
        Ok(CouponValidation::applied(coupon.snapshot(), discount))
    }

    /// Count one use of `code` for the payment `reference`. Repeating the call
    /// for the same reference never counts twice.
    pub async fn record_redemption(
        &self,
        code: &str,
        reference: &str,
    ) -> Result<CouponRedemption, StoreError> {
        let code = normalize_code(code);
        let outcome = self.store.increment_coupon_usage(&code, reference).await?;

        match outcome {
            CouponRedemption::Counted => {
                tracing::info!(code = %code, reference = %reference, "Coupon redemption recorded")
            }
            CouponRedemption::AlreadyCounted => {
                tracing::debug!(code = %code, reference = %reference, "Coupon redemption already recorded")
            }
            CouponRedemption::Unavailable => tracing::warn!(
                code = %code,
                reference = %reference,
                "Coupon redemption not counted: missing or exhausted"
            ),
        }

        Ok(outcome)
    }
}
