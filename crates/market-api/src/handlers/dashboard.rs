//! Developer dashboard: aggregates computed by the database, paired with
//! their display strings.

use crate::error::ApiResult;
use crate::extractors::{AppQuery, CurrentUser};
use crate::state::AppState;
use axum::{extract::State, Json};
use market_core::{DashboardStats, FormattedDashboard, RevenuePoint, StatsStore};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REVENUE_MONTHS: u32 = 6;
pub const MAX_REVENUE_MONTHS: u32 = 24;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: DashboardStats,
    pub formatted: FormattedDashboard,
}

pub async fn stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<StatsResponse>> {
    let stats = state.store.dashboard_stats(user.id()).await?;
    Ok(Json(StatsResponse {
        formatted: FormattedDashboard::from_stats(&stats),
        stats,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RevenueParams {
    #[serde(default)]
    pub months: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    pub months: u32,
    pub series: Vec<RevenuePoint>,
}

pub async fn revenue(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(params): AppQuery<RevenueParams>,
) -> ApiResult<Json<RevenueResponse>> {
    let months = params
        .months
        .unwrap_or(DEFAULT_REVENUE_MONTHS)
        .clamp(1, MAX_REVENUE_MONTHS);
    let series = state.store.revenue_series(user.id(), months).await?;
    Ok(Json(RevenueResponse { months, series }))
}
