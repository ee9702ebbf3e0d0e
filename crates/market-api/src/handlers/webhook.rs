use crate::error::{ApiError, ApiResult};
use crate::fulfillment::PurchaseFulfillment;
use crate::state::AppState;
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use market_stripe::dispatch_webhook_event;
use serde_json::{json, Value};
use tracing::{error, info, instrument};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Stripe webhook receiver.
///
/// The body is taken as raw bytes: the signature covers it byte for byte.
/// Nothing is touched unless the signature verifies.
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Missing Stripe-Signature header"))?;

    let event = state
        .payments
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| {
            error!("Webhook verification failed: {}", e);
            e
        })?;

    info!(
        "Received webhook: type={:?}, id={}",
        event.event_type, event.event_id
    );

    let handler = PurchaseFulfillment::new(state.store.clone());
    dispatch_webhook_event(&handler, event).await?;

    Ok(Json(json!({ "received": true })))
}
