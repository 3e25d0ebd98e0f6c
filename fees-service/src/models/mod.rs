mod coupon;
mod fee;
mod payment;

pub use coupon::{normalize_code, Coupon, CouponSnapshot, DiscountType};
pub use fee::{Fee, FeeStatus, FeeUpdate};
pub use payment::{minor_to_major, Payment, PaymentMetadata, PaymentStatus, PAYMENT_METHOD_PAYSTACK};
