use anyhow::anyhow;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{
    bson::{doc, Bson, Document},
    Collection, Database, IndexModel,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::store::{CouponRedemption, FeeStore, StoreError};
use crate::models::{Coupon, Fee, FeeUpdate, Payment};

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB adapter over the `fees`, `payments` and `coupons` collections.
#[derive(Clone)]
pub struct MongoStore {
    fee_collection: Collection<Fee>,
    payment_collection: Collection<Payment>,
    coupon_collection: Collection<Coupon>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            fee_collection: db.collection("fees"),
            payment_collection: db.collection("payments"),
            coupon_collection: db.collection("coupons"),
        }
    }

    /// Create the indexes the reconciliation flow depends on.
    ///
    /// The unique index on `payments.reference` is what finally rules out a
    /// second record for the same provider transaction.
    pub async fn init_indexes(&self) -> anyhow::Result<()> {
        let reference_index = IndexModel::builder()
            .keys(doc! { "reference": 1 })
            .options(
                IndexOptions::builder()
                    .name("payment_reference_unique_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let fee_payments_index = IndexModel::builder()
            .keys(doc! { "fee_id": 1, "payment_date": -1 })
            .options(
                IndexOptions::builder()
                    .name("fee_payments_idx".to_string())
                    .build(),
            )
            .build();

        self.payment_collection
            .create_indexes([reference_index, fee_payments_index], None)
            .await?;

        let code_index = IndexModel::builder()
            .keys(doc! { "code": 1 })
            .options(
                IndexOptions::builder()
                    .name("coupon_code_unique_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.coupon_collection
            .create_indexes([code_index], None)
            .await?;

        tracing::info!("Fees service indexes initialized");
        Ok(())
    }
}

fn backend(err: mongodb::error::Error) -> StoreError {
    StoreError::Backend(anyhow::Error::new(err))
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn as_double(value: Decimal) -> Result<Bson, StoreError> {
    value
        .to_f64()
        .map(Bson::Double)
        .ok_or_else(|| StoreError::Backend(anyhow!("amount {} is out of range", value)))
}

/// Fees written by other tools may predate the version field; treat a
/// missing field as version 0.
fn version_filter(expected_version: i64) -> Document {
    if expected_version == 0 {
        doc! { "$or": [ { "version": 0_i64 }, { "version": { "$exists": false } } ] }
    } else {
        doc! { "version": expected_version }
    }
}

#[async_trait]
impl FeeStore for MongoStore {
    async fn get_fee(&self, fee_id: &str) -> Result<Option<Fee>, StoreError> {
        self.fee_collection
            .find_one(doc! { "_id": fee_id }, None)
            .await
            .map_err(backend)
    }

    async fn apply_fee_update(&self, update: &FeeUpdate) -> Result<(), StoreError> {
        let mut filter = doc! {
            "_id": update.fee_id.as_str(),
            "applied_references": { "$ne": update.reference.as_str() },
        };
        filter.extend(version_filter(update.expected_version));

        let changes = doc! {
            "$set": {
                "amount_paid": as_double(update.amount_paid)?,
                "balance": as_double(update.balance)?,
                "status": update.status.as_str(),
                "updated_at": mongodb::bson::DateTime::from_chrono(update.updated_at),
            },
            "$inc": { "version": 1_i64 },
            "$push": { "applied_references": update.reference.as_str() },
        };

        let result = self
            .fee_collection
            .update_one(filter, changes, None)
            .await
            .map_err(backend)?;

        if result.matched_count == 0 {
            return Err(StoreError::Conflict(update.fee_id.clone()));
        }
        Ok(())
    }

    async fn find_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        self.payment_collection
            .find_one(doc! { "reference": reference }, None)
            .await
            .map_err(backend)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        match self.payment_collection.insert_one(payment, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate(payment.reference.clone())),
            Err(e) => Err(backend(e)),
        }
    }

    async fn list_payments_for_fee(&self, fee_id: &str) -> Result<Vec<Payment>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "payment_date": -1 })
            .build();

        let cursor = self
            .payment_collection
            .find(doc! { "fee_id": fee_id }, Some(options))
            .await
            .map_err(backend)?;

        cursor.try_collect().await.map_err(backend)
    }

    async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        self.coupon_collection
            .find_one(doc! { "code": code }, None)
            .await
            .map_err(backend)
    }

    async fn increment_coupon_usage(
        &self,
        code: &str,
        reference: &str,
    ) -> Result<CouponRedemption, StoreError> {
        let filter = doc! {
            "code": code,
            "redeemed_references": { "$ne": reference },
            "$expr": { "$lt": [ { "$ifNull": ["$used_count", 0] }, "$max_uses" ] },
        };
        let changes = doc! {
            "$inc": { "used_count": 1_i64 },
            "$push": { "redeemed_references": reference },
        };

        let result = self
            .coupon_collection
            .update_one(filter, changes, None)
            .await
            .map_err(backend)?;

        if result.modified_count == 1 {
            return Ok(CouponRedemption::Counted);
        }

        let already = self
            .coupon_collection
            .find_one(doc! { "code": code, "redeemed_references": reference }, None)
            .await
            .map_err(backend)?;

        Ok(if already.is_some() {
            CouponRedemption::AlreadyCounted
        } else {
            CouponRedemption::Unavailable
        })
    }
}
