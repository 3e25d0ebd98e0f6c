//! Storage port for fees, payments and coupons.
//!
//! Handlers never reach a database client directly; they receive an
//! `Arc<dyn FeeStore>` at startup so tests can substitute doubles.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Coupon, Fee, FeeUpdate, Payment};

pub type SharedStore = Arc<dyn FeeStore>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The conditional fee write did not match: the fee changed since it was
    /// read, or the reference was already applied.
    #[error("concurrent modification of fee {0}")]
    Conflict(String),

    /// A payment with this reference already exists.
    #[error("payment with reference {0} already recorded")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Result of counting a coupon use for one payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponRedemption {
    Counted,
    /// This reference was counted by an earlier delivery.
    AlreadyCounted,
    /// The coupon does not exist or has no uses left.
    Unavailable,
}

#[async_trait]
pub trait FeeStore: Send + Sync {
    async fn get_fee(&self, fee_id: &str) -> Result<Option<Fee>, StoreError>;

    /// Apply `update` only if the fee is still at `update.expected_version`
    /// and has not yet applied `update.reference`. Bumps the version and
    /// appends the reference atomically.
    async fn apply_fee_update(&self, update: &FeeUpdate) -> Result<(), StoreError>;

    async fn find_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError>;

    /// Insert a new payment record; `StoreError::Duplicate` when the
    /// reference is already taken.
    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError>;

    /// Payments for a fee, newest first.
    async fn list_payments_for_fee(&self, fee_id: &str) -> Result<Vec<Payment>, StoreError>;

    /// Look up by normalized (uppercase) code.
    async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;

    /// Count one use of the coupon for the payment identified by `reference`.
    ///
    /// Increments `used_count` and records `reference` in one conditional write,
    /// only while `used_count < max_uses` and `reference` is not yet recorded.
    async fn increment_coupon_usage(
        &self,
        code: &str,
        reference: &str,
    ) -> Result<CouponRedemption, StoreError>;
}

impl From<StoreError> for service_core::error::AppError {
    fn from(err: StoreError) -> Self {
        service_core::error::AppError::DatabaseError(anyhow::Error::new(err))
    }
}
