//! Application startup and lifecycle management.

use crate::config::{FeesConfig, StoreBackend};
use crate::handlers;
use crate::services::{
    init_metrics, CouponService, EventDispatcher, InMemoryStore, MongoStore, PaymentReconciler,
    PaystackClient, SharedStore,
};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub paystack: PaystackClient,
    pub dispatcher: EventDispatcher,
    pub coupons: CouponService,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application, connecting the store selected by configuration.
    pub async fn build(config: FeesConfig) -> Result<Self, AppError> {
        let store: SharedStore = match config.database.backend {
            StoreBackend::Mongo => Arc::new(connect_mongo(&config).await?),
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                Arc::new(InMemoryStore::new())
            }
        };

        Self::build_with_store(config, store).await
    }

    /// Build the application on top of an already constructed store.
    pub async fn build_with_store(config: FeesConfig, store: SharedStore) -> Result<Self, AppError> {
        init_metrics();

        let paystack = PaystackClient::new(config.paystack.clone()).map_err(|e| {
            tracing::error!(error = %e, "Failed to build Paystack client");
            AppError::InternalError(e.into())
        })?;
        if paystack.is_configured() {
            tracing::info!("Paystack client initialized");
        } else {
            tracing::warn!("Paystack secret key not configured - webhooks and verification are disabled");
        }

        let reconciler = Arc::new(PaymentReconciler::new(
            store.clone(),
            config.reconciliation.clone(),
        ));

        let state = AppState {
            store: store.clone(),
            paystack,
            dispatcher: EventDispatcher::new(reconciler),
            coupons: CouponService::new(store),
        };

        let listener = TcpListener::bind((config.common.host.as_str(), config.common.port))
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    host = %config.common.host,
                    port = config.common.port,
                    "Failed to bind HTTP listener"
                );
                AppError::from(e)
            })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Fees service listener bound");

        Ok(Self {
            port,
            listener,
            router: router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}

async fn connect_mongo(config: &FeesConfig) -> Result<MongoStore, AppError> {
    let mut client_options = ClientOptions::parse(config.database.url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::from(e)
        })?;
    client_options.app_name = Some(config.service_name.clone());

    let client = Client::with_options(client_options).map_err(|e| {
        tracing::error!("Failed to create MongoDB client: {}", e);
        AppError::from(e)
    })?;
    let db = client.database(&config.database.db_name);

    let store = MongoStore::new(&db);
    store.init_indexes().await.map_err(|e| {
        tracing::error!("Failed to initialize database indexes: {}", e);
        AppError::DatabaseError(e)
    })?;

    Ok(store)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/webhooks/paystack",
            post(handlers::webhooks::paystack_webhook),
        )
        .route(
            "/payments/verify",
            get(handlers::transactions::missing_reference),
        )
        .route(
            "/payments/verify/",
            get(handlers::transactions::missing_reference),
        )
        .route(
            "/payments/verify/:reference",
            get(handlers::transactions::verify_transaction),
        )
        .route(
            "/payments/initialize",
            post(handlers::payments::initialize_payment),
        )
        .route(
            "/fees/:id/payments",
            get(handlers::payments::list_fee_payments),
        )
        .route(
            "/coupons/validate",
            post(handlers::coupons::validate_coupon),
        )
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}
