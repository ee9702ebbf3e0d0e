//! Plugin CRUD. Input is schema-validated before any store call, and a
//! developer only ever sees their own unpublished listings. Touching
//! someone else's plugin answers 404, as if it did not exist.

use super::find_plugin;
use crate::error::ApiResult;
use crate::extractors::{AppJson, AppQuery, CurrentUser};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use market_core::{
    MarketError, NewPlugin, Plugin, PluginPatch, PluginQuery, PluginStore, PurchaseStore,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
pub struct PluginList {
    pub plugins: Vec<Plugin>,
    pub count: usize,
}

impl From<Vec<Plugin>> for PluginList {
    fn from(plugins: Vec<Plugin>) -> Self {
        Self {
            count: plugins.len(),
            plugins,
        }
    }
}

/// Public catalogue: active and published listings only
pub async fn list_plugins(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PluginQuery>,
) -> ApiResult<Json<PluginList>> {
    let query = PluginQuery {
        public_only: true,
        ..query
    };
    let plugins = state.store.list_plugins(&query).await?;
    Ok(Json(plugins.into()))
}

/// Everything the caller owns, any status
pub async fn list_my_plugins(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<PluginQuery>,
) -> ApiResult<Json<PluginList>> {
    let query = PluginQuery {
        developer_id: Some(user.id().to_string()),
        ..query
    };
    let plugins = state.store.list_plugins(&query).await?;
    Ok(Json(plugins.into()))
}

#[instrument(skip(state, user, input), fields(user = %user.id(), name = %input.name))]
pub async fn create_plugin(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<NewPlugin>,
) -> ApiResult<impl IntoResponse> {
    let plugin = Plugin::from_new(input, user.id())?;
    let plugin = state.store.insert_plugin(&plugin).await?;
    info!("Created plugin {} ({})", plugin.id, plugin.slug);
    Ok((StatusCode::CREATED, Json(plugin)))
}

pub async fn get_plugin(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(id_or_slug): Path<String>,
) -> ApiResult<Json<Plugin>> {
    let plugin = find_plugin(&state, &id_or_slug).await?;

    let is_owner = user.as_ref().is_some_and(|u| plugin.is_owned_by(u.id()));
    if !plugin.is_public() && !is_owner {
        return Err(MarketError::plugin_not_found(id_or_slug).into());
    }
    Ok(Json(plugin))
}

/// Fetch a plugin the caller owns
async fn owned_plugin(state: &AppState, user: &CurrentUser, id: &str) -> ApiResult<Plugin> {
    let plugin = find_plugin(state, id).await?;
    if !plugin.is_owned_by(user.id()) {
        return Err(MarketError::plugin_not_found(id).into());
    }
    Ok(plugin)
}

#[instrument(skip(state, user, patch), fields(user = %user.id()))]
pub async fn update_plugin(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    AppJson(patch): AppJson<PluginPatch>,
) -> ApiResult<Json<Plugin>> {
    patch.validate()?;
    let plugin = owned_plugin(&state, &user, &id).await?;

    let updated = state
        .store
        .update_plugin(&plugin.id, &patch)
        .await?
        .ok_or_else(|| MarketError::plugin_not_found(&plugin.id))?;
    info!("Updated plugin {}", updated.id);
    Ok(Json(updated))
}

#[instrument(skip(state, user), fields(user = %user.id()))]
pub async fn delete_plugin(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let plugin = owned_plugin(&state, &user, &id).await?;

    if !state.store.delete_plugin(&plugin.id).await? {
        return Err(MarketError::plugin_not_found(&plugin.id).into());
    }
    info!("Deleted plugin {}", plugin.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Whether the caller holds a completed purchase for the plugin
pub async fn ownership(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id_or_slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let plugin = find_plugin(&state, &id_or_slug).await?;
    let owned = state
        .store
        .find_completed_purchase(user.id(), &plugin.id)
        .await?
        .is_some();
    Ok(Json(json!({ "plugin_id": plugin.id, "owned": owned })))
}
