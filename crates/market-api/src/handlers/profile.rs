//! Profile, notification preferences and mock API keys.

use super::load_or_create_profile;
use crate::error::ApiResult;
use crate::extractors::{AppJson, CurrentUser};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use market_core::{ApiKey, NotificationPatch, NotificationPreferences, Profile, ProfileStore};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

async fn caller_profile(state: &AppState, user: &CurrentUser) -> ApiResult<Profile> {
    load_or_create_profile(state, user.id(), user.user.email.as_deref()).await
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Profile>> {
    Ok(Json(caller_profile(&state, &user).await?))
}

pub async fn update_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(patch): AppJson<NotificationPatch>,
) -> ApiResult<Json<NotificationPreferences>> {
    let mut profile = caller_profile(&state, &user).await?;
    patch.apply(&mut profile.notification_preferences);
    profile.updated_at = chrono::Utc::now();

    let profile = state.store.upsert_profile(&profile).await?;
    Ok(Json(profile.notification_preferences))
}

pub async fn list_api_keys(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let profile = caller_profile(&state, &user).await?;
    Ok(Json(json!({
        "api_keys": profile.api_keys,
        "count": profile.api_keys.len()
    })))
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
}

/// The full secret is in this response and nowhere else
pub async fn create_api_key(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(request): AppJson<CreateApiKeyRequest>,
) -> ApiResult<impl IntoResponse> {
    let generated = ApiKey::generate(&request.name)?;
    let mut profile = caller_profile(&state, &user).await?;
    profile.add_api_key(generated.key.clone())?;
    state.store.upsert_profile(&profile).await?;

    info!("API key {} created for {}", generated.key.id, user.id());
    Ok((StatusCode::CREATED, Json(generated)))
}

pub async fn revoke_api_key(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(key_id): Path<String>,
) -> ApiResult<StatusCode> {
    let mut profile = caller_profile(&state, &user).await?;
    profile.revoke_api_key(&key_id)?;
    state.store.upsert_profile(&profile).await?;

    info!("API key {} revoked for {}", key_id, user.id());
    Ok(StatusCode::NO_CONTENT)
}
