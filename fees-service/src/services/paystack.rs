//! Paystack payment provider client.
//!
//! Covers webhook authentication (HMAC-SHA512 of the raw body keyed with the
//! secret key), transaction verification by reference and transaction
//! initialisation for hosted checkout.

use crate::config::PaystackConfig;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::utils::signature::verify_payload_signature;
use thiserror::Error;

use crate::dtos::ChargeMetadata;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

#[derive(Debug, Error)]
pub enum PaystackError {
    #[error("Paystack credentials not configured")]
    NotConfigured,

    #[error("Paystack did not respond in time")]
    Timeout,

    #[error("Paystack request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Paystack rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Unexpected Paystack response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl From<reqwest::Error> for PaystackError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PaystackError::Timeout
        } else {
            PaystackError::Transport(err)
        }
    }
}

/// Raw provider answer, passed through to callers unchanged.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

/// Request body for `POST /transaction/initialize`.
#[derive(Debug, Serialize)]
pub struct InitializeTransaction {
    pub email: String,
    /// Amount in kobo.
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub metadata: ChargeMetadata,
}

#[derive(Debug, Deserialize)]
struct PaystackEnvelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Clone)]
pub struct PaystackClient {
    client: Client,
    config: PaystackConfig,
}

impl PaystackClient {
    pub fn new(config: PaystackConfig) -> Result<Self, PaystackError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(PaystackError::Transport)?;

        Ok(Self { client, config })
    }

    /// Check if Paystack is configured (secret key is set).
    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    /// Authenticate a webhook delivery against the exact bytes received.
    pub fn verify_webhook_signature(&self, body: &[u8], signature: Option<&str>) -> bool {
        let secret = self
            .config
            .webhook_secret
            .as_ref()
            .unwrap_or(&self.config.secret_key);

        let is_valid = verify_payload_signature(secret.expose_secret().as_bytes(), body, signature);

        if !is_valid {
            tracing::warn!(
                signature_present = signature.is_some(),
                "Webhook signature verification failed"
            );
        }

        is_valid
    }

    /// Look up a transaction by reference.
    ///
    /// Any HTTP answer from Paystack, success or not, is returned as a
    /// [`ProviderResponse`]; only transport failures are errors.
    pub async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<ProviderResponse, PaystackError> {
        if !self.is_configured() {
            return Err(PaystackError::NotConfigured);
        }

        let url = format!("{}/transaction/verify/{}", self.config.api_base_url, reference);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        tracing::debug!(status = %status, reference = %reference, "Paystack verify response");

        let body = serde_json::from_str(&text).unwrap_or_else(|_| {
            serde_json::json!({ "status": false, "message": text })
        });

        Ok(ProviderResponse { status, body })
    }

    /// Start a hosted checkout; returns the authorization URL for the payer.
    pub async fn initialize_transaction(
        &self,
        mut request: InitializeTransaction,
    ) -> Result<InitializedTransaction, PaystackError> {
        if !self.is_configured() {
            return Err(PaystackError::NotConfigured);
        }
        if request.callback_url.is_none() {
            request.callback_url = self.config.callback_url.clone();
        }

        let url = format!("{}/transaction/initialize", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let envelope: Option<PaystackEnvelope<InitializedTransaction>> =
            serde_json::from_str(&body).ok();

        match envelope {
            Some(PaystackEnvelope {
                status: true,
                data: Some(data),
                ..
            }) if status.is_success() => {
                tracing::info!(
                    reference = %data.reference,
                    amount = request.amount,
                    "Paystack transaction initialized"
                );
                Ok(data)
            }
            Some(envelope) => {
                tracing::error!(
                    status = %status,
                    message = %envelope.message,
                    "Paystack transaction initialization failed"
                );
                Err(PaystackError::Rejected {
                    status,
                    message: envelope.message,
                })
            }
            None => {
                tracing::error!(status = %status, "Unparseable Paystack initialize response");
                Err(PaystackError::Rejected {
                    status,
                    message: "unparseable response".to_string(),
                })
            }
        }
    }
}
