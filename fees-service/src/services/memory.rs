use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::store::{CouponRedemption, FeeStore, StoreError};
use crate::models::{normalize_code, Coupon, Fee, FeeUpdate, Payment};

/// In-process store with the same conditional-write semantics as Mongo.
///
/// Each map entry is locked while it is checked and written, which gives the
/// per-document atomicity the reconciler relies on.
#[derive(Default)]
pub struct InMemoryStore {
    fees: DashMap<String, Fee>,
    payments: DashMap<String, Payment>,
    coupons: DashMap<String, Coupon>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_fee(&self, fee: Fee) {
        self.fees.insert(fee.id.clone(), fee);
    }

    pub fn insert_coupon(&self, mut coupon: Coupon) {
        coupon.code = normalize_code(&coupon.code);
        self.coupons.insert(coupon.code.clone(), coupon);
    }

    pub fn fee(&self, fee_id: &str) -> Option<Fee> {
        self.fees.get(fee_id).map(|f| f.clone())
    }

    pub fn coupon(&self, code: &str) -> Option<Coupon> {
        self.coupons.get(&normalize_code(code)).map(|c| c.clone())
    }

    pub fn payment_count(&self) -> usize {
        self.payments.len()
    }
}

#[async_trait]
impl FeeStore for InMemoryStore {
    async fn get_fee(&self, fee_id: &str) -> Result<Option<Fee>, StoreError> {
        Ok(self.fee(fee_id))
    }

    async fn apply_fee_update(&self, update: &FeeUpdate) -> Result<(), StoreError> {
        let mut fee = self
            .fees
            .get_mut(&update.fee_id)
            .ok_or_else(|| StoreError::Conflict(update.fee_id.clone()))?;

        if fee.version != update.expected_version || fee.has_applied(&update.reference) {
            return Err(StoreError::Conflict(update.fee_id.clone()));
        }

        fee.apply(update);
        Ok(())
    }

    async fn find_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self.payments.get(reference).map(|p| p.clone()))
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        match self.payments.entry(payment.reference.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(payment.reference.clone())),
            Entry::Vacant(slot) => {
                slot.insert(payment.clone());
                Ok(())
            }
        }
    }

    async fn list_payments_for_fee(&self, fee_id: &str) -> Result<Vec<Payment>, StoreError> {
        let mut payments: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| p.fee_id == fee_id)
            .map(|p| p.clone())
            .collect();
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(payments)
    }

    async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(self.coupons.get(code).map(|c| c.clone()))
    }

    async fn increment_coupon_usage(
        &self,
        code: &str,
        reference: &str,
    ) -> Result<CouponRedemption, StoreError> {
        let Some(mut coupon) = self.coupons.get_mut(code) else {
            return Ok(CouponRedemption::Unavailable);
        };

        if coupon.has_redeemed(reference) {
            return Ok(CouponRedemption::AlreadyCounted);
        }
        if coupon.is_exhausted() {
            return Ok(CouponRedemption::Unavailable);
        }

        coupon.used_count += 1;
        coupon.redeemed_references.push(reference.to_string());
        Ok(CouponRedemption::Counted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let store = InMemoryStore::new();
        let fee = Fee::new("fee_1", "stu_1", Decimal::new(100, 0));
        store.insert_fee(fee.clone());

        let first = fee.credit(Decimal::new(10, 0), "ref_a", Utc::now());
        let stale = fee.credit(Decimal::new(20, 0), "ref_b", Utc::now());

        store.apply_fee_update(&first).await.unwrap();
        assert!(matches!(
            store.apply_fee_update(&stale).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.fee("fee_1").unwrap().amount_paid, Decimal::new(10, 0));
    }

    #[tokio::test]
    async fn reapplying_reference_is_a_conflict() {
        let store = InMemoryStore::new();
        let fee = Fee::new("fee_1", "stu_1", Decimal::new(100, 0));
        store.insert_fee(fee);

        let current = store.fee("fee_1").unwrap();
        store
            .apply_fee_update(&current.credit(Decimal::new(10, 0), "ref_a", Utc::now()))
            .await
            .unwrap();

        let current = store.fee("fee_1").unwrap();
        let again = current.credit(Decimal::new(10, 0), "ref_a", Utc::now());
        assert!(matches!(
            store.apply_fee_update(&again).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn coupon_usage_never_exceeds_max() {
        let store = InMemoryStore::new();
        store.insert_coupon(Coupon {
            id: "c1".into(),
            code: "once".into(),
            discount_type: crate::models::DiscountType::Fixed,
            discount_value: Decimal::new(5, 0),
            max_uses: 1,
            used_count: 0,
            expiry_date: None,
            is_active: true,
            redeemed_references: Vec::new(),
        });

        assert_eq!(
            store.increment_coupon_usage("ONCE", "ref_a").await.unwrap(),
            CouponRedemption::Counted
        );
        assert_eq!(
            store.increment_coupon_usage("ONCE", "ref_a").await.unwrap(),
            CouponRedemption::AlreadyCounted
        );
        assert_eq!(
            store.increment_coupon_usage("ONCE", "ref_b").await.unwrap(),
            CouponRedemption::Unavailable
        );
        assert_eq!(store.coupon("once").unwrap().used_count, 1);
    }
}
