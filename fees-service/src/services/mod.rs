pub mod coupons;
pub mod dispatcher;
pub mod memory;
pub mod metrics;
pub mod mongo;
pub mod paystack;
pub mod reconciler;
pub mod recorder;
pub mod store;

pub use coupons::CouponService;
pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use mongo::MongoStore;
pub use paystack::PaystackClient;
pub use reconciler::{ChargeOutcome, PaymentReconciler, ReconcileError, SkipReason};
pub use recorder::{PaymentRecorder, RecordOutcome};
pub use store::{CouponRedemption, FeeStore, SharedStore, StoreError};
