use crate::error::ApiResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use market_core::PurchaseStore;
use serde_json::json;

/// The caller's purchases, newest first
pub async fn list_purchases(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let purchases = state.store.list_purchases_for_user(user.id()).await?;
    Ok(Json(json!({
        "purchases": purchases,
        "count": purchases.len()
    })))
}
