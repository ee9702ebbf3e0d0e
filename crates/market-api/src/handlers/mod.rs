//! # Request Handlers
//!
//! One module per route group. Handlers stay thin: validate input, call
//! the store / auth / payment seams on `AppState`, shape the response.

pub mod auth;
pub mod chat;
pub mod checkout;
pub mod dashboard;
pub mod health;
pub mod plugins;
pub mod profile;
pub mod purchases;
pub mod webhook;

use crate::error::ApiResult;
use crate::state::AppState;
use market_core::{MarketError, Plugin, PluginStore, Profile, ProfileStore};
use uuid::Uuid;

/// Resolve a path segment that may be a plugin id or its slug
pub(crate) async fn find_plugin(state: &AppState, id_or_slug: &str) -> ApiResult<Plugin> {
    let plugin = if Uuid::parse_str(id_or_slug).is_ok() {
        state.store.get_plugin(id_or_slug).await?
    } else {
        state.store.get_plugin_by_slug(id_or_slug).await?
    };
    plugin.ok_or_else(|| MarketError::plugin_not_found(id_or_slug).into())
}

/// Load the caller's profile, creating it on first access
pub(crate) async fn load_or_create_profile(
    state: &AppState,
    user_id: &str,
    email: Option<&str>,
) -> ApiResult<Profile> {
    if let Some(profile) = state.store.get_profile(user_id).await? {
        return Ok(profile);
    }

    tracing::info!("Creating profile for {}", user_id);
    let profile = Profile::new(user_id, email.map(String::from));
    Ok(state.store.upsert_profile(&profile).await?)
}
