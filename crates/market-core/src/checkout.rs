//! # Checkout Types
//!
//! Provider-neutral checkout sessions and webhook events.

use crate::plugin::Plugin;
use crate::price::{Currency, Price};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const METADATA_PLUGIN_ID: &str = "plugin_id";
pub const METADATA_USER_ID: &str = "user_id";

/// Everything a provider needs to open a hosted payment page for one plugin
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub plugin_id: String,
    pub plugin_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Price,
    pub user_id: String,
    /// Provider customer to attach the session to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub idempotency_key: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutRequest {
    pub fn for_plugin(
        plugin: &Plugin,
        user_id: impl Into<String>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        let user_id = user_id.into();
        let mut metadata = HashMap::new();
        metadata.insert(METADATA_PLUGIN_ID.to_string(), plugin.id.clone());
        metadata.insert(METADATA_USER_ID.to_string(), user_id.clone());

        Self {
            plugin_id: plugin.id.clone(),
            plugin_name: plugin.name.clone(),
            description: (!plugin.description.is_empty()).then(|| plugin.description.clone()),
            price: plugin.price,
            idempotency_key: format!("checkout-{}-{}-{}", user_id, plugin.id, Uuid::new_v4()),
            user_id,
            customer_id: None,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            metadata,
        }
    }

    pub fn with_customer(mut self, customer_id: Option<String>) -> Self {
        self.customer_id = customer_id;
        self
    }
}

/// Status of a checkout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// Session created, awaiting payment
    #[default]
    Open,
    /// Customer finished the hosted flow
    Complete,
    /// Session expired without completion
    Expired,
}

/// Whether money actually moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    #[default]
    Unpaid,
    NoPaymentRequired,
}

/// A checkout session created by a payment provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID
    pub session_id: String,

    /// Provider name (e.g., "stripe")
    pub provider: String,

    /// URL to redirect the customer to; absent once the session is closed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,

    #[serde(default)]
    pub status: CheckoutStatus,

    #[serde(default)]
    pub payment_status: PaymentStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    /// Total in smallest unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_total: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CheckoutSession {
    pub fn new(
        session_id: impl Into<String>,
        provider: impl Into<String>,
        checkout_url: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            provider: provider.into(),
            checkout_url,
            status: CheckoutStatus::Open,
            payment_status: PaymentStatus::Unpaid,
            payment_intent_id: None,
            customer_id: None,
            customer_email: None,
            amount_total: None,
            currency: None,
            metadata: HashMap::new(),
            expires_at: None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_USER_ID).map(|s| s.as_str())
    }

    pub fn plugin_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_PLUGIN_ID).map(|s| s.as_str())
    }
}

/// Webhook event types the marketplace reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Checkout session completed
    CheckoutCompleted,
    /// Checkout session expired
    CheckoutExpired,
    /// Refund issued against a payment intent
    RefundIssued,
    /// Anything else (logged and acknowledged)
    Unknown(String),
}

/// A verified and parsed webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event ID from provider
    pub event_id: String,

    pub event_type: WebhookEventType,

    pub provider: String,

    /// Related checkout session (checkout events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Related payment intent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    /// Amount paid or refunded (smallest unit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,

    /// Raw event object (for handlers that need more fields)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,

    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::NewPlugin;

    #[test]
    fn test_request_for_plugin() {
        let plugin = Plugin::from_new(
            NewPlugin::new("Doc Writer", Price::from_cents(1500, Currency::USD)),
            "dev-1",
        )
        .unwrap();

        let request = CheckoutRequest::for_plugin(&plugin, "user-9", "https://a/ok", "https://a/no")
            .with_customer(Some("cus_1".to_string()));

        assert_eq!(request.metadata.get(METADATA_PLUGIN_ID), Some(&plugin.id));
        assert_eq!(request.metadata.get(METADATA_USER_ID).map(String::as_str), Some("user-9"));
        assert!(request.idempotency_key.starts_with("checkout-user-9-"));
        assert!(request.description.is_none());
        assert_eq!(request.customer_id.as_deref(), Some("cus_1"));
    }
}
