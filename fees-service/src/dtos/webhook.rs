//! Paystack webhook event shapes.
//!
//! The envelope is `{ "event": <type>, "data": { ... } }`. Known event types
//! become typed variants; anything else is carried as
//! [`WebhookEvent::Unhandled`] so it can be acknowledged without side effects.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const CHARGE_SUCCESS: &str = "charge.success";
pub const TRANSFER_SUCCESS: &str = "transfer.success";

#[derive(Debug, Clone)]
pub enum WebhookEvent {
    ChargeSuccess(ChargeData),
    TransferSuccess(TransferData),
    Unhandled { event: String },
}

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("malformed webhook envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("malformed '{event}' payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawWebhookEvent {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl WebhookEvent {
    /// Parse an authenticated webhook body.
    pub fn from_slice(body: &[u8]) -> Result<Self, EventParseError> {
        let raw: RawWebhookEvent =
            serde_json::from_slice(body).map_err(EventParseError::Envelope)?;

        let payload_error = |source| EventParseError::Payload {
            event: raw.event.clone(),
            source,
        };

        Ok(match raw.event.as_str() {
            CHARGE_SUCCESS => WebhookEvent::ChargeSuccess(
                serde_json::from_value(raw.data.clone()).map_err(payload_error)?,
            ),
            TRANSFER_SUCCESS => WebhookEvent::TransferSuccess(
                serde_json::from_value(raw.data.clone()).map_err(payload_error)?,
            ),
            _ => WebhookEvent::Unhandled {
                event: raw.event.clone(),
            },
        })
    }

    pub fn event_type(&self) -> &str {
        match self {
            WebhookEvent::ChargeSuccess(_) => CHARGE_SUCCESS,
            WebhookEvent::TransferSuccess(_) => TRANSFER_SUCCESS,
            WebhookEvent::Unhandled { event } => event,
        }
    }
}

/// Payload of a `charge.success` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeData {
    /// Provider transaction reference; the idempotency key.
    pub reference: String,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default, deserialize_with = "lenient_metadata")]
    pub metadata: ChargeMetadata,
}

impl ChargeData {
    pub fn payer_email(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.email.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub email: Option<String>,
}

/// Metadata attached by this service when the payment was initialised.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChargeMetadata {
    #[serde(default)]
    pub fee_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub discount_applied: bool,
    #[serde(
        default,
        serialize_with = "rust_decimal::serde::float_option::serialize"
    )]
    pub discount_amount: Option<Decimal>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Payload of a `transfer.success` event.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferData {
    pub reference: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

/// Paystack echoes metadata back either as an object or as a JSON-encoded
/// string; anything else is treated as empty.
fn lenient_metadata<'de, D>(deserializer: D) -> Result<ChargeMetadata, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let value = match value {
        serde_json::Value::String(s) => serde_json::from_str(&s).unwrap_or_default(),
        other => other,
    };

    match value {
        serde_json::Value::Object(_) => {
            serde_json::from_value(value).map_err(serde::de::Error::custom)
        }
        _ => Ok(ChargeMetadata::default()),
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
        serde_json::Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    })
}
