//! # Middleware
//!
//! Maintenance mode: while `MAINTENANCE_MODE` is set every request except
//! the maintenance page itself is redirected there.

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

pub const MAINTENANCE_PATH: &str = "/maintenance";

pub async fn maintenance_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.maintenance_mode && request.uri().path() != MAINTENANCE_PATH {
        debug!("Maintenance redirect: {}", request.uri().path());
        return Redirect::temporary(MAINTENANCE_PATH).into_response();
    }

    next.run(request).await
}
