//! Shared fixtures: an in-memory store, fixed bearer tokens and a Stripe
//! API mocked with wiremock.

#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use market_api::{create_router, AppConfig, AppState};
use market_core::{
    AuthUser, Currency, InMemoryStore, NewPlugin, Plugin, PluginStatus, Price, StaticAuthProvider,
};
use market_stripe::{signature_header, StripeCheckoutStrategy, StripeConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub const BUYER_TOKEN: &str = "buyer-token";
pub const BUYER_ID: &str = "user-buyer";
pub const DEV_TOKEN: &str = "dev-token";
pub const DEV_ID: &str = "user-dev";

pub const SESSION_ID: &str = "cs_test_a1";
pub const CHECKOUT_URL: &str = "https://checkout.stripe.com/c/pay/cs_test_a1";

/// Seeded listings, all owned by the developer
pub struct Catalogue {
    /// Published, $19.99
    pub paid: Plugin,
    /// Published, free
    pub free: Plugin,
    /// Draft, $25.00
    pub draft: Plugin,
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryStore>,
    pub stripe: MockServer,
    pub catalogue: Catalogue,
}

fn plugin(name: &str, cents: i64, status: PluginStatus) -> Plugin {
    Plugin::from_new(
        NewPlugin::new(name, Price::from_cents(cents, Currency::USD))
            .with_status(status)
            .with_category("coding"),
        DEV_ID,
    )
    .unwrap()
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig::default()).await
}

pub async fn spawn_app_with(config: AppConfig) -> TestApp {
    let catalogue = Catalogue {
        paid: plugin("Code Reviewer", 1999, PluginStatus::Published),
        free: plugin("SQL Explainer", 0, PluginStatus::Published),
        draft: plugin("Test Generator", 2500, PluginStatus::Draft),
    };
    let store = Arc::new(InMemoryStore::with_plugins([
        catalogue.paid.clone(),
        catalogue.free.clone(),
        catalogue.draft.clone(),
    ]));

    let auth = StaticAuthProvider::new();
    auth.insert_token(
        BUYER_TOKEN,
        AuthUser {
            id: BUYER_ID.to_string(),
            email: Some("buyer@example.com".to_string()),
        },
    )
    .await;
    auth.insert_token(
        DEV_TOKEN,
        AuthUser {
            id: DEV_ID.to_string(),
            email: Some("dev@example.com".to_string()),
        },
    )
    .await;

    let stripe = MockServer::start().await;
    let payments = StripeCheckoutStrategy::new(
        StripeConfig::new("sk_test_123", WEBHOOK_SECRET).with_api_base_url(stripe.uri()),
    )
    .unwrap();

    let state = AppState::new(store.clone(), Arc::new(auth), Arc::new(payments), config);
    let server = TestServer::new(create_router(state)).unwrap();

    TestApp {
        server,
        store,
        stripe,
        catalogue,
    }
}

impl TestApp {
    /// Stripe answers customer and session creation
    pub async fn mock_checkout(&self) {
        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cus_test_1",
                "object": "customer"
            })))
            .mount(&self.stripe)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(
                BUYER_ID,
                "open",
                "unpaid",
            )))
            .mount(&self.stripe)
            .await;
    }

    /// Stripe returns the session with the given owner on retrieval
    pub async fn mock_retrieve(&self, owner: &str) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/v1/checkout/sessions/cs_test_[a-z0-9]+$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(
                owner, "complete", "paid",
            )))
            .mount(&self.stripe)
            .await;
    }
}

pub fn session_json(user_id: &str, status: &str, payment_status: &str) -> Value {
    json!({
        "id": SESSION_ID,
        "object": "checkout.session",
        "url": CHECKOUT_URL,
        "status": status,
        "payment_status": payment_status,
        "amount_total": 1999,
        "currency": "usd",
        "client_reference_id": user_id,
        "metadata": { "user_id": user_id, "plugin_id": "p" },
        "expires_at": 1893456000
    })
}

/// A `checkout.session.completed` event body
pub fn completed_event(session_id: &str, plugin_id: &str, payment_intent: &str) -> Value {
    json!({
        "id": format!("evt_{}", session_id),
        "type": "checkout.session.completed",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": {
            "id": session_id,
            "object": "checkout.session",
            "payment_intent": payment_intent,
            "payment_status": "paid",
            "amount_total": 1999,
            "currency": "usd",
            "metadata": { "plugin_id": plugin_id, "user_id": BUYER_ID }
        }}
    })
}

/// A `charge.refunded` event body
pub fn refund_event(payment_intent: &str) -> Value {
    json!({
        "id": format!("evt_refund_{}", payment_intent),
        "type": "charge.refunded",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": {
            "id": "ch_test_1",
            "object": "charge",
            "payment_intent": payment_intent,
            "amount_refunded": 1999,
            "refunded": true
        }}
    })
}

/// Body bytes plus a valid `Stripe-Signature` header for them
pub fn signed(event: &Value) -> (Vec<u8>, HeaderName, HeaderValue) {
    let body = serde_json::to_vec(event).unwrap();
    let header = signature_header(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), &body).unwrap();
    (
        body,
        HeaderName::from_static("stripe-signature"),
        HeaderValue::from_str(&header).unwrap(),
    )
}
