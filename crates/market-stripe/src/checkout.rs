//! # Stripe Checkout Sessions
//!
//! Implementation of the Stripe Customers and Checkout Sessions APIs.
//! Every plugin purchase goes through a hosted one-time payment page.

use crate::config::StripeConfig;
use crate::signature::{verify_signature, DEFAULT_TOLERANCE_SECS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_core::checkout::METADATA_USER_ID;
use market_core::{
    CheckoutRequest, CheckoutSession, CheckoutStatus, Currency, MarketError, MarketResult,
    PaymentStatus, PaymentStrategy, WebhookEvent, WebhookEventType,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe Checkout Session strategy
///
/// Uses Stripe's hosted checkout page, so card data never touches the
/// marketplace.
pub struct StripeCheckoutStrategy {
    config: StripeConfig,
    client: Client,
}

impl StripeCheckoutStrategy {
    pub fn new(config: StripeConfig) -> MarketResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MarketError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> MarketResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Form parameters for a one-time payment session
    fn session_params(request: &CheckoutRequest) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("client_reference_id".to_string(), request.user_id.clone()),
            (
                "line_items[0][price_data][currency]".to_string(),
                request.price.currency.as_str().to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                request.price.amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.plugin_name.clone(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
        ];

        if let Some(ref desc) = request.description {
            params.push((
                "line_items[0][price_data][product_data][description]".to_string(),
                desc.clone(),
            ));
        }

        if let Some(ref customer) = request.customer_id {
            params.push(("customer".to_string(), customer.clone()));
        }

        // Sorted so identical requests produce identical bodies
        let mut metadata: Vec<_> = request.metadata.iter().collect();
        metadata.sort();
        for (key, value) in metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
            // Copied onto the payment intent so refunds can be traced back
            params.push((
                format!("payment_intent_data[metadata][{}]", key),
                value.clone(),
            ));
        }

        params
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
    }

    /// Send a request and return the body of a successful response
    async fn execute(&self, builder: RequestBuilder) -> MarketResult<String> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| MarketError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MarketError::NetworkError(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }

        error!("Stripe API error: status={}, body={}", status, body);

        if status == StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound("Stripe resource not found".to_string()));
        }

        let message = serde_json::from_str::<StripeErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

        Err(MarketError::ProviderError {
            provider: PROVIDER.to_string(),
            message,
        })
    }
}

#[async_trait]
impl PaymentStrategy for StripeCheckoutStrategy {
    #[instrument(skip(self, email))]
    async fn create_customer(&self, email: Option<&str>, user_id: &str) -> MarketResult<String> {
        let mut params = vec![(format!("metadata[{}]", METADATA_USER_ID), user_id.to_string())];
        if let Some(email) = email {
            params.push(("email".to_string(), email.to_string()));
        }

        let body = self
            .execute(
                self.client
                    .post(self.config.endpoint("/v1/customers"))
                    .form(&params),
            )
            .await?;

        let customer: StripeCustomerResponse = serde_json::from_str(&body).map_err(|e| {
            MarketError::Serialization(format!("Failed to parse Stripe customer: {}", e))
        })?;

        info!("Created Stripe customer: id={}", customer.id);
        Ok(customer.id)
    }

    #[instrument(skip(self, request), fields(plugin_id = %request.plugin_id, user_id = %request.user_id))]
    async fn create_checkout(&self, request: &CheckoutRequest) -> MarketResult<CheckoutSession> {
        if request.price.is_free() {
            return Err(MarketError::InvalidRequest(
                "Checkout requires a positive amount".to_string(),
            ));
        }

        let params = Self::session_params(request);
        debug!("Creating Stripe checkout session: {} params", params.len());

        let body = self
            .execute(
                self.client
                    .post(self.config.endpoint("/v1/checkout/sessions"))
                    .header("Idempotency-Key", &request.idempotency_key)
                    .form(&params),
            )
            .await?;

        let session = parse_session(&body)?;
        info!(
            "Created Stripe checkout session: id={}, url={:?}",
            session.session_id, session.checkout_url
        );
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn retrieve_checkout(&self, session_id: &str) -> MarketResult<CheckoutSession> {
        validate_session_id(session_id)?;
        let path = format!("/v1/checkout/sessions/{}", session_id);
        let body = self
            .execute(self.client.get(self.config.endpoint(&path)))
            .await
            .map_err(|e| match e {
                MarketError::NotFound(_) => {
                    MarketError::NotFound(format!("Checkout session {} not found", session_id))
                }
                other => other,
            })?;

        parse_session(&body)
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> MarketResult<WebhookEvent> {
        verify_signature(
            &self.config.webhook_secret,
            payload,
            signature,
            Utc::now().timestamp(),
            DEFAULT_TOLERANCE_SECS,
        )?;

        let event = parse_event(payload)?;
        debug!("Verified Stripe webhook: type={:?}", event.event_type);
        Ok(event)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    status: Option<CheckoutStatus>,
    #[serde(default)]
    payment_status: Option<PaymentStatus>,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    customer_details: Option<StripeCustomerDetails>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

/// Session ids are interpolated into the request path: `cs_` followed by
/// letters, digits and underscores only
fn validate_session_id(session_id: &str) -> MarketResult<()> {
    let valid = session_id
        .strip_prefix("cs_")
        .is_some_and(|rest| {
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(MarketError::InvalidRequest(format!(
            "Invalid checkout session id: {}",
            session_id
        )));
    }
    Ok(())
}

fn parse_session(body: &str) -> MarketResult<CheckoutSession> {
    let response: StripeCheckoutSessionResponse = serde_json::from_str(body).map_err(|e| {
        MarketError::Serialization(format!("Failed to parse Stripe response: {}", e))
    })?;

    let mut session = CheckoutSession::new(response.id, PROVIDER, response.url);
    session.status = response.status.unwrap_or_default();
    session.payment_status = response.payment_status.unwrap_or_default();
    session.payment_intent_id = response.payment_intent;
    session.customer_id = response.customer;
    session.customer_email = response.customer_details.and_then(|d| d.email);
    session.amount_total = response.amount_total;
    session.currency = response.currency.as_deref().and_then(Currency::parse);
    session.metadata = response.metadata;
    session.expires_at = response
        .expires_at
        .and_then(|ts| DateTime::from_timestamp(ts, 0));
    Ok(session)
}

/// Map a raw Stripe event onto the provider-neutral shape
pub(crate) fn parse_event(payload: &[u8]) -> MarketResult<WebhookEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
        MarketError::WebhookParseError(format!("Failed to parse webhook: {}", e))
    })?;

    let object = &event.data.object;
    let str_field = |key: &str| object.get(key).and_then(|v| v.as_str()).map(String::from);

    let (event_type, session_id, amount) = match event.event_type.as_str() {
        "checkout.session.completed" => (
            WebhookEventType::CheckoutCompleted,
            str_field("id"),
            object.get("amount_total").and_then(|v| v.as_i64()),
        ),
        "checkout.session.expired" => (
            WebhookEventType::CheckoutExpired,
            str_field("id"),
            object.get("amount_total").and_then(|v| v.as_i64()),
        ),
        // The object is a charge, not a session
        "charge.refunded" => (
            WebhookEventType::RefundIssued,
            None,
            object.get("amount_refunded").and_then(|v| v.as_i64()),
        ),
        other => (WebhookEventType::Unknown(other.to_string()), None, None),
    };

    let customer_email = object
        .get("customer_details")
        .and_then(|cd| cd.get("email"))
        .and_then(|v| v.as_str())
        .map(String::from)
        .or_else(|| str_field("receipt_email"));

    Ok(WebhookEvent {
        event_id: event.id,
        event_type,
        provider: PROVIDER.to_string(),
        session_id,
        payment_intent_id: str_field("payment_intent"),
        customer_email,
        amount,
        currency: str_field("currency").as_deref().and_then(Currency::parse),
        raw_data: Some(serde_json::Value::Object(event.data.object)),
        timestamp: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::signature_header;
    use market_core::{NewPlugin, Plugin, Price};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WEBHOOK_SECRET: &str = "whsec_test_secret";

    fn strategy(server: &MockServer) -> StripeCheckoutStrategy {
        let config = StripeConfig::new("sk_test_123", WEBHOOK_SECRET).with_api_base_url(server.uri());
        StripeCheckoutStrategy::new(config).unwrap()
    }

    fn request() -> CheckoutRequest {
        let plugin = Plugin::from_new(
            NewPlugin::new("Code Reviewer", Price::from_cents(1999, Currency::USD)),
            "dev-1",
        )
        .unwrap();
        CheckoutRequest::for_plugin(&plugin, "user-1", "https://m.dev/ok", "https://m.dev/no")
            .with_customer(Some("cus_42".to_string()))
    }

    #[test]
    fn test_session_params() {
        let request = request();
        let params = StripeCheckoutStrategy::session_params(&request);
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("client_reference_id"), Some("user-1"));
        assert_eq!(get("customer"), Some("cus_42"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("1999"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(get("line_items[0][quantity]"), Some("1"));
        assert_eq!(get("metadata[user_id]"), Some("user-1"));
        assert_eq!(
            get("payment_intent_data[metadata][plugin_id]"),
            Some(request.plugin_id.as_str())
        );
        assert_eq!(get("metadata[plugin_id]"), Some(request.plugin_id.as_str()));
    }

    #[tokio::test]
    async fn test_create_checkout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("Authorization", "Bearer sk_test_123"))
            .and(body_string_contains("mode=payment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1",
                "status": "open",
                "payment_status": "unpaid",
                "customer": "cus_42",
                "amount_total": 1999,
                "currency": "usd",
                "metadata": { "plugin_id": "p1", "user_id": "user-1" },
                "expires_at": 1_900_000_000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = strategy(&server).create_checkout(&request()).await.unwrap();

        assert_eq!(session.session_id, "cs_test_1");
        assert_eq!(session.provider, "stripe");
        assert!(session.checkout_url.is_some());
        assert_eq!(session.status, CheckoutStatus::Open);
        assert_eq!(session.user_id(), Some("user-1"));
        assert_eq!(session.currency, Some(Currency::USD));
        assert!(session.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_provider_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "Invalid currency", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = strategy(&server).create_checkout(&request()).await.unwrap_err();
        match err {
            MarketError::ProviderError { provider, message } => {
                assert_eq!(provider, "stripe");
                assert_eq!(message, "Invalid currency");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_customer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .and(body_string_contains("email=buyer%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cus_new" })))
            .mount(&server)
            .await;

        let id = strategy(&server)
            .create_customer(Some("buyer@example.com"), "user-1")
            .await
            .unwrap();
        assert_eq!(id, "cus_new");
    }

    #[tokio::test]
    async fn test_retrieve_missing_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "message": "No such checkout.session" }
            })))
            .mount(&server)
            .await;

        let err = strategy(&server).retrieve_checkout("cs_missing").await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_retrieve_rejects_path_traversal() {
        let server = MockServer::start().await;
        let strategy = strategy(&server);

        for id in [
            "../../customers/cus_victim",
            "cs_1/../../customers/cus_victim",
            "cs_1?expand[]=customer",
            "cs_1#frag",
            "cs_",
            "pi_123",
        ] {
            let err = strategy.retrieve_checkout(id).await.unwrap_err();
            assert!(matches!(err, MarketError::InvalidRequest(_)), "{}", id);
        }

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verify_webhook() {
        let server = MockServer::start().await;
        let stripe = strategy(&server);

        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": 1_700_000_000,
            "data": { "object": {
                "id": "cs_test_1",
                "payment_intent": "pi_1",
                "payment_status": "paid",
                "amount_total": 1999,
                "currency": "usd",
                "customer_details": { "email": "buyer@example.com" }
            }}
        })
        .to_string();
        let header = signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), payload.as_bytes()).unwrap();

        let event = stripe.verify_webhook(payload.as_bytes(), &header).await.unwrap();
        assert_eq!(event.event_type, WebhookEventType::CheckoutCompleted);
        assert_eq!(event.session_id.as_deref(), Some("cs_test_1"));
        assert_eq!(event.payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(event.amount, Some(1999));

        let bad = stripe.verify_webhook(payload.as_bytes(), "t=1,v1=00").await;
        assert!(matches!(bad, Err(MarketError::WebhookVerificationFailed(_))));
    }

    #[test]
    fn test_parse_refund_and_unknown_events() {
        let refund = json!({
            "id": "evt_2",
            "type": "charge.refunded",
            "created": 1_700_000_000,
            "data": { "object": {
                "id": "ch_1",
                "payment_intent": "pi_1",
                "amount_refunded": 500,
                "refunded": false
            }}
        });
        let event = parse_event(refund.to_string().as_bytes()).unwrap();
        assert_eq!(event.event_type, WebhookEventType::RefundIssued);
        assert_eq!(event.session_id, None);
        assert_eq!(event.payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(event.amount, Some(500));

        let other = json!({
            "id": "evt_3",
            "type": "customer.created",
            "created": 1_700_000_000,
            "data": { "object": { "id": "cus_1" } }
        });
        let event = parse_event(other.to_string().as_bytes()).unwrap();
        assert_eq!(
            event.event_type,
            WebhookEventType::Unknown("customer.created".to_string())
        );

        assert!(matches!(
            parse_event(b"not json"),
            Err(MarketError::WebhookParseError(_))
        ));
    }
}
