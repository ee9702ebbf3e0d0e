//! # Stripe Webhook Handling
//!
//! Typed views over verified events and an async handler trait that the
//! API implements to drive purchase status.

use async_trait::async_trait;
use market_core::checkout::{METADATA_PLUGIN_ID, METADATA_USER_ID};
use market_core::{Currency, MarketError, MarketResult, WebhookEvent, WebhookEventType};
use std::collections::HashMap;
use tracing::{debug, info, warn};

fn raw_object(event: &WebhookEvent) -> MarketResult<&serde_json::Map<String, serde_json::Value>> {
    event
        .raw_data
        .as_ref()
        .ok_or_else(|| MarketError::WebhookParseError("Missing raw data".to_string()))?
        .as_object()
        .ok_or_else(|| MarketError::WebhookParseError("Raw data is not an object".to_string()))
}

/// Parsed `checkout.session.completed` / `checkout.session.expired` data
#[derive(Debug, Clone)]
pub struct CheckoutSessionData {
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    pub amount_total: i64,
    pub currency: Currency,
    pub payment_status: String,
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionData {
    /// Parse from a webhook event
    pub fn from_event(event: &WebhookEvent) -> MarketResult<Self> {
        let obj = raw_object(event)?;
        let str_field = |key: &str| obj.get(key).and_then(|v| v.as_str()).map(String::from);

        let session_id = str_field("id")
            .ok_or_else(|| MarketError::WebhookParseError("Missing session id".to_string()))?;

        let customer_email = obj
            .get("customer_details")
            .and_then(|cd| cd.get("email"))
            .and_then(|v| v.as_str())
            .map(String::from);

        let metadata = obj
            .get("metadata")
            .and_then(|m| m.as_object())
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            session_id,
            payment_intent_id: str_field("payment_intent"),
            customer_id: str_field("customer"),
            customer_email,
            amount_total: obj.get("amount_total").and_then(|v| v.as_i64()).unwrap_or(0),
            currency: str_field("currency")
                .as_deref()
                .and_then(Currency::parse)
                .unwrap_or_default(),
            payment_status: str_field("payment_status").unwrap_or_else(|| "unknown".to_string()),
            metadata,
        })
    }

    /// Check if payment was successful
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    pub fn plugin_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_PLUGIN_ID).map(|s| s.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_USER_ID).map(|s| s.as_str())
    }
}

/// Parsed `charge.refunded` data
#[derive(Debug, Clone)]
pub struct RefundData {
    pub charge_id: String,
    pub payment_intent_id: String,
    pub amount_refunded: i64,
    /// False for partial refunds
    pub fully_refunded: bool,
}

impl RefundData {
    pub fn from_event(event: &WebhookEvent) -> MarketResult<Self> {
        let obj = raw_object(event)?;

        let charge_id = obj
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| MarketError::WebhookParseError("Missing charge id".to_string()))?;

        let payment_intent_id = event.payment_intent_id.clone().ok_or_else(|| {
            MarketError::WebhookParseError("Refund without payment intent".to_string())
        })?;

        Ok(Self {
            charge_id,
            payment_intent_id,
            amount_refunded: obj
                .get("amount_refunded")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
            fully_refunded: obj
                .get("refunded")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        })
    }
}

/// Webhook event handler trait
///
/// Every method defaults to logging and acknowledging.
#[allow(unused_variables)]
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn on_checkout_completed(&self, data: CheckoutSessionData) -> MarketResult<()> {
        info!(
            "Checkout completed: session={}, amount={}",
            data.session_id, data.amount_total
        );
        Ok(())
    }

    async fn on_checkout_expired(&self, data: CheckoutSessionData) -> MarketResult<()> {
        info!("Checkout expired: session={}", data.session_id);
        Ok(())
    }

    async fn on_refund_issued(&self, data: RefundData) -> MarketResult<()> {
        info!(
            "Refund issued: payment_intent={}, amount={}",
            data.payment_intent_id, data.amount_refunded
        );
        Ok(())
    }

    /// Called for unknown/unhandled events
    async fn on_unknown_event(&self, event: &WebhookEvent) -> MarketResult<()> {
        debug!("Unhandled webhook event: {:?}", event.event_type);
        Ok(())
    }
}

/// Dispatch a webhook event to the appropriate handler method
pub async fn dispatch_webhook_event(
    handler: &dyn WebhookHandler,
    event: WebhookEvent,
) -> MarketResult<()> {
    match &event.event_type {
        WebhookEventType::CheckoutCompleted => {
            let data = CheckoutSessionData::from_event(&event)?;
            handler.on_checkout_completed(data).await
        }
        WebhookEventType::CheckoutExpired => {
            let data = CheckoutSessionData::from_event(&event)?;
            handler.on_checkout_expired(data).await
        }
        WebhookEventType::RefundIssued => {
            let data = RefundData::from_event(&event)?;
            if !data.fully_refunded {
                warn!(
                    "Partial refund on {}; purchase is marked refunded",
                    data.payment_intent_id
                );
            }
            handler.on_refund_issued(data).await
        }
        WebhookEventType::Unknown(_) => handler.on_unknown_event(&event).await,
    }
}

/// Events to enable on the Stripe webhook endpoint
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "checkout.session.expired",
    "charge.refunded",
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;

    fn mock_event(event_type: WebhookEventType, raw: serde_json::Value) -> WebhookEvent {
        WebhookEvent {
            event_id: "evt_test".to_string(),
            event_type,
            provider: "stripe".to_string(),
            session_id: raw.get("id").and_then(|v| v.as_str()).map(String::from),
            payment_intent_id: raw
                .get("payment_intent")
                .and_then(|v| v.as_str())
                .map(String::from),
            customer_email: None,
            amount: None,
            currency: Some(Currency::USD),
            raw_data: Some(raw),
            timestamp: Utc::now(),
        }
    }

    fn completed_event() -> WebhookEvent {
        mock_event(
            WebhookEventType::CheckoutCompleted,
            json!({
                "id": "cs_test_123",
                "payment_intent": "pi_test_456",
                "customer": "cus_test_789",
                "customer_details": { "email": "test@example.com" },
                "amount_total": 1000,
                "currency": "usd",
                "payment_status": "paid",
                "metadata": { "plugin_id": "plg_1", "user_id": "usr_1" }
            }),
        )
    }

    #[test]
    fn test_parse_checkout_completed() {
        let data = CheckoutSessionData::from_event(&completed_event()).unwrap();

        assert_eq!(data.session_id, "cs_test_123");
        assert_eq!(data.payment_intent_id, Some("pi_test_456".to_string()));
        assert_eq!(data.customer_email, Some("test@example.com".to_string()));
        assert_eq!(data.amount_total, 1000);
        assert!(data.is_paid());
        assert_eq!(data.plugin_id(), Some("plg_1"));
        assert_eq!(data.user_id(), Some("usr_1"));
    }

    #[test]
    fn test_parse_refund() {
        let event = mock_event(
            WebhookEventType::RefundIssued,
            json!({ "id": "ch_1", "payment_intent": "pi_9", "amount_refunded": 1000, "refunded": true }),
        );
        let data = RefundData::from_event(&event).unwrap();
        assert_eq!(data.charge_id, "ch_1");
        assert_eq!(data.payment_intent_id, "pi_9");
        assert!(data.fully_refunded);

        let orphan = mock_event(WebhookEventType::RefundIssued, json!({ "id": "ch_2" }));
        assert!(RefundData::from_event(&orphan).is_err());
    }

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WebhookHandler for RecordingHandler {
        async fn on_checkout_completed(&self, data: CheckoutSessionData) -> MarketResult<()> {
            self.calls.lock().unwrap().push(format!("completed:{}", data.session_id));
            Ok(())
        }

        async fn on_checkout_expired(&self, data: CheckoutSessionData) -> MarketResult<()> {
            self.calls.lock().unwrap().push(format!("expired:{}", data.session_id));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_webhook() {
        let handler = RecordingHandler::default();

        dispatch_webhook_event(&handler, completed_event()).await.unwrap();
        dispatch_webhook_event(
            &handler,
            mock_event(WebhookEventType::CheckoutExpired, json!({ "id": "cs_old" })),
        )
        .await
        .unwrap();
        // Default implementation acknowledges
        dispatch_webhook_event(
            &handler,
            mock_event(WebhookEventType::Unknown("invoice.paid".into()), json!({})),
        )
        .await
        .unwrap();

        let calls = handler.calls.lock().unwrap();
        assert_eq!(*calls, vec!["completed:cs_test_123", "expired:cs_old"]);
    }
}
