//! Checkout session creation and retrieval.

use super::{find_plugin, load_or_create_profile};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppJson, AppQuery, CurrentUser};
use crate::state::AppState;
use axum::{extract::State, Json};
use market_core::{
    validate_redirect_url, CheckoutRequest, CheckoutSession, MarketError, ProfileStore, Purchase,
    PurchaseStore,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

/// Create checkout request
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Plugin id or slug
    pub plugin_id: String,
    /// Override for the default success page
    #[serde(default)]
    pub success_url: Option<String>,
    /// Override for the default cancel page
    #[serde(default)]
    pub cancel_url: Option<String>,
}

/// Create checkout response
#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    pub session_id: String,
    /// Hosted payment page (redirect the user here)
    pub checkout_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[instrument(skip(state, user, request), fields(user = %user.id(), plugin = %request.plugin_id))]
pub async fn create_checkout(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(request): AppJson<CreateCheckoutRequest>,
) -> ApiResult<Json<CreateCheckoutResponse>> {
    for url in [&request.success_url, &request.cancel_url].into_iter().flatten() {
        validate_redirect_url(url)?;
    }

    let plugin = find_plugin(&state, &request.plugin_id).await?;
    plugin.ensure_purchasable()?;

    if state
        .store
        .find_completed_purchase(user.id(), &plugin.id)
        .await?
        .is_some()
    {
        return Err(MarketError::AlreadyOwned {
            plugin_id: plugin.id.clone(),
        }
        .into());
    }

    let mut profile = load_or_create_profile(&state, user.id(), user.user.email.as_deref()).await?;
    if profile.stripe_customer_id.is_none() {
        let customer_id = state
            .payments
            .create_customer(user.user.email.as_deref(), user.id())
            .await?;
        info!("Created payment customer {} for {}", customer_id, user.id());
        profile.stripe_customer_id = Some(customer_id);
        profile = state.store.upsert_profile(&profile).await?;
    }

    let checkout = CheckoutRequest::for_plugin(
        &plugin,
        user.id(),
        request
            .success_url
            .unwrap_or_else(|| state.urls.success_url()),
        request.cancel_url.unwrap_or_else(|| state.urls.cancel_url()),
    )
    .with_customer(profile.stripe_customer_id.clone());

    let session = state.payments.create_checkout(&checkout).await?;
    let checkout_url = session.checkout_url.clone().ok_or_else(|| MarketError::ProviderError {
        provider: state.payments.provider_name().to_string(),
        message: "Session has no checkout URL".to_string(),
    })?;

    let purchase = Purchase::pending(&plugin.id, user.id(), &session.session_id, plugin.price);
    if let Err(e) = state.store.insert_purchase(&purchase).await {
        // The webhook rebuilds the purchase from session metadata
        error!(
            "Failed to record pending purchase for session {}: {}",
            session.session_id, e
        );
    }

    info!("Checkout session created: {}", session.session_id);

    Ok(Json(CreateCheckoutResponse {
        session_id: session.session_id,
        checkout_url,
        expires_at: session.expires_at.map(|t| t.to_rfc3339()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RetrieveCheckoutParams {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Current state of one of the caller's sessions
pub async fn retrieve_checkout(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(params): AppQuery<RetrieveCheckoutParams>,
) -> ApiResult<Json<CheckoutSession>> {
    let session_id = params
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing session_id"))?;

    let session = state.payments.retrieve_checkout(&session_id).await?;
    if session.user_id() != Some(user.id()) {
        return Err(ApiError::not_found(format!(
            "Checkout session not found: {}",
            session_id
        )));
    }

    Ok(Json(session))
}
