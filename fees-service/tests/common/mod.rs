#![allow(dead_code)]

use fees_service::config::{
    DatabaseConfig, FeesConfig, PaystackConfig, ReconciliationConfig, StoreBackend,
};
use async_trait::async_trait;
use fees_service::models::{Coupon, DiscountType, Fee, FeeUpdate, Payment};
use fees_service::services::{
    CouponRedemption, FeeStore, InMemoryStore, SharedStore, StoreError,
};
use fees_service::startup::Application;
use rust_decimal::Decimal;
use secrecy::Secret;
use service_core::config::Config;
use service_core::utils::signature::sign_payload;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub const TEST_SECRET_KEY: &str = "sk_test_fees_secret";
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<InMemoryStore>,
    pub paystack: MockServer,
    pub client: reqwest::Client,
}

pub fn test_config(paystack_url: &str) -> FeesConfig {
    FeesConfig {
        common: Config {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
        },
        service_name: "fees-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            backend: StoreBackend::Memory,
            url: Secret::new(String::new()),
            db_name: "fees_test".to_string(),
        },
        paystack: PaystackConfig {
            secret_key: Secret::new(TEST_SECRET_KEY.to_string()),
            webhook_secret: None,
            api_base_url: paystack_url.to_string(),
            callback_url: Some("https://school.example/payments/callback".to_string()),
            timeout: Duration::from_secs(2),
        },
        reconciliation: ReconciliationConfig {
            max_attempts: 5,
            retry_delay: Duration::from_millis(1),
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let paystack = MockServer::start().await;
        Self::spawn_with_config(test_config(&paystack.uri()), paystack).await
    }

    pub async fn spawn_with_config(config: FeesConfig, paystack: MockServer) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::spawn_with_store(config, paystack, store.clone(), store).await
    }

    /// Spawn against `backend`; `store` is the in-memory state the test seeds
    /// and inspects, usually the one `backend` wraps.
    pub async fn spawn_with_store(
        config: FeesConfig,
        paystack: MockServer,
        store: Arc<InMemoryStore>,
        backend: SharedStore,
    ) -> Self {
        let app = Application::build_with_store(config, backend)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            store,
            paystack,
            client,
        }
    }

    pub fn seed_fee(&self, id: &str, total: i64) -> Fee {
        let mut fee = Fee::new(id, "stu_1", Decimal::new(total, 0));
        fee.student_name = Some("Ada Obi".to_string());
        self.store.insert_fee(fee.clone());
        fee
    }

    pub fn seed_coupon(&self, code: &str, discount_type: DiscountType, value: i64) -> Coupon {
        let coupon = Coupon {
            id: uuid::Uuid::new_v4().to_string().into(),
            code: code.to_string(),
            discount_type,
            discount_value: Decimal::new(value, 0),
            max_uses: 10,
            used_count: 0,
            expiry_date: None,
            is_active: true,
            redeemed_references: Vec::new(),
        };
        self.store.insert_coupon(coupon.clone());
        coupon
    }

    /// POST a webhook body signed with the test secret key.
    pub async fn post_signed_webhook(&self, body: &str) -> reqwest::Response {
        let signature = sign_payload(TEST_SECRET_KEY.as_bytes(), body.as_bytes())
            .expect("Failed to sign payload");
        self.post_webhook(body, Some(&signature)).await
    }

    pub async fn post_webhook(&self, body: &str, signature: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .post(format!("{}/webhooks/paystack", self.address))
            .header("content-type", "application/json")
            .body(body.to_string());
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        request.send().await.expect("Failed to execute request")
    }
}

/// A `charge.success` body as Paystack sends it.
pub fn charge_success(reference: &str, fee_id: &str, amount: i64) -> String {
    serde_json::json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "amount": amount,
            "paid_at": "2026-01-15T10:30:00.000Z",
            "channel": "card",
            "customer": { "email": "parent@example.com" },
            "metadata": {
                "fee_id": fee_id,
                "student_id": "stu_1",
                "student_name": "Ada Obi"
            }
        }
    })
    .to_string()
}

/// Store whose fee writes always fail, like a primary that stopped
/// accepting writes. Reads go to the wrapped in-memory store.
pub struct FailingStore {
    pub inner: Arc<InMemoryStore>,
}

pub const FAILING_STORE_ERROR: &str = "connection reset by mongo-primary:27017";

#[async_trait]
impl FeeStore for FailingStore {
    async fn get_fee(&self, fee_id: &str) -> Result<Option<Fee>, StoreError> {
        self.inner.get_fee(fee_id).await
    }

    async fn apply_fee_update(&self, _update: &FeeUpdate) -> Result<(), StoreError> {
        Err(StoreError::Backend(anyhow::anyhow!(FAILING_STORE_ERROR)))
    }

    async fn find_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        self.inner.find_payment_by_reference(reference).await
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        self.inner.insert_payment(payment).await
    }

    async fn list_payments_for_fee(&self, fee_id: &str) -> Result<Vec<Payment>, StoreError> {
        self.inner.list_payments_for_fee(fee_id).await
    }

    async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        self.inner.find_coupon_by_code(code).await
    }

    async fn increment_coupon_usage(
        &self,
        code: &str,
        reference: &str,
    ) -> Result<CouponRedemption, StoreError> {
        self.inner.increment_coupon_usage(code, reference).await
    }
}

/// Store whose fee writes always lose the optimistic-concurrency race.
pub struct ConflictingStore {
    pub inner: Arc<InMemoryStore>,
}

#[async_trait]
impl FeeStore for ConflictingStore {
    async fn get_fee(&self, fee_id: &str) -> Result<Option<Fee>, StoreError> {
        self.inner.get_fee(fee_id).await
    }

    async fn apply_fee_update(&self, update: &FeeUpdate) -> Result<(), StoreError> {
        Err(StoreError::Conflict(update.fee_id.clone()))
    }

    async fn find_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        self.inner.find_payment_by_reference(reference).await
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        self.inner.insert_payment(payment).await
    }

    async fn list_payments_for_fee(&self, fee_id: &str) -> Result<Vec<Payment>, StoreError> {
        self.inner.list_payments_for_fee(fee_id).await
    }

    async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        self.inner.find_coupon_by_code(code).await
    }

    async fn increment_coupon_usage(
        &self,
        code: &str,
        reference: &str,
    ) -> Result<CouponRedemption, StoreError> {
        self.inner.increment_coupon_usage(code, reference).await
    }
}
