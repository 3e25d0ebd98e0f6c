//! Request/response shapes for the HTTP surface and the provider's webhook.

pub mod coupons;
pub mod payments;
pub mod webhook;

pub use coupons::{CouponValidation, ValidateCouponRequest};
pub use payments::{InitializePaymentRequest, InitializePaymentResponse, PaymentResponse};
pub use webhook::{
    ChargeData, ChargeMetadata, Customer, EventParseError, TransferData, WebhookAck, WebhookEvent,
};
