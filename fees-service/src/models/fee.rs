use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One billing obligation for one student in one term.
///
/// `amount_paid + balance == total_amount` holds for every state this service
/// writes; `status` is derived from `balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fee {
    #[serde(rename = "_id")]
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub term: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub status: FeeStatus,
    /// Optimistic concurrency counter, bumped on every reconciliation write.
    #[serde(default)]
    pub version: i64,
    /// Provider references already credited to this fee.
    #[serde(default)]
    pub applied_references: Vec<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    Unpaid,
    Partial,
    Paid,
}

impl FeeStatus {
    pub fn for_balance(balance: Decimal) -> Self {
        if balance <= Decimal::ZERO {
            FeeStatus::Paid
        } else {
            FeeStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Unpaid => "unpaid",
            FeeStatus::Partial => "partial",
            FeeStatus::Paid => "paid",
        }
    }
}

/// A conditional write produced by crediting a payment to a fee.
///
/// Stores must apply it only if the fee is still at `expected_version` and
/// `reference` is not yet in its applied references.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeUpdate {
    pub fee_id: String,
    pub expected_version: i64,
    pub reference: String,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub status: FeeStatus,
    pub updated_at: DateTime<Utc>,
}

impl Fee {
    pub fn new(
        id: impl Into<String>,
        student_id: impl Into<String>,
        total_amount: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            student_id: student_id.into(),
            student_name: None,
            term: None,
            total_amount,
            amount_paid: Decimal::ZERO,
            balance: total_amount,
            status: FeeStatus::Unpaid,
            version: 0,
            applied_references: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn has_applied(&self, reference: &str) -> bool {
        self.applied_references.iter().any(|r| r == reference)
    }

    /// Compute the state after crediting `amount` (major units) for `reference`.
    pub fn credit(&self, amount: Decimal, reference: &str, at: DateTime<Utc>) -> FeeUpdate {
        let amount_paid = self.amount_paid + amount;
        let balance = self.total_amount - amount_paid;

        FeeUpdate {
            fee_id: self.id.clone(),
            expected_version: self.version,
            reference: reference.to_string(),
            amount_paid,
            balance,
            status: FeeStatus::for_balance(balance),
            updated_at: at,
        }
    }

    /// Apply a previously computed update in place.
    pub fn apply(&mut self, update: &FeeUpdate) {
        self.amount_paid = update.amount_paid;
        self.balance = update.balance;
        self.status = update.status;
        self.updated_at = update.updated_at;
        self.version += 1;
        self.applied_references.push(update.reference.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_then_paid() {
        let mut fee = Fee::new("fee_1", "student_1", Decimal::new(100, 0));

        let first = fee.credit(Decimal::new(60, 0), "ref_a", Utc::now());
        assert_eq!(first.amount_paid, Decimal::new(60, 0));
        assert_eq!(first.balance, Decimal::new(40, 0));
        assert_eq!(first.status, FeeStatus::Partial);
        fee.apply(&first);

        let second = fee.credit(Decimal::new(40, 0), "ref_b", Utc::now());
        assert_eq!(second.amount_paid, Decimal::new(100, 0));
        assert_eq!(second.balance, Decimal::ZERO);
        assert_eq!(second.status, FeeStatus::Paid);
        assert_eq!(second.expected_version, 1);
        fee.apply(&second);

        assert_eq!(fee.amount_paid + fee.balance, fee.total_amount);
        assert!(fee.has_applied("ref_a"));
        assert!(fee.has_applied("ref_b"));
        assert_eq!(fee.version, 2);
    }

    #[test]
    fn overpayment_is_paid_with_negative_balance() {
        let fee = Fee::new("fee_1", "student_1", Decimal::new(100, 0));
        let update = fee.credit(Decimal::new(150, 0), "ref_a", Utc::now());

        assert_eq!(update.balance, Decimal::new(-50, 0));
        assert_eq!(update.status, FeeStatus::Paid);
        assert_eq!(update.amount_paid + update.balance, fee.total_amount);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&FeeStatus::Partial).unwrap(),
            "\"partial\""
        );
        assert_eq!(FeeStatus::Paid.as_str(), "paid");
    }
}
