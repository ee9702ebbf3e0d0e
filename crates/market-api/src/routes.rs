//! # Routes
//!
//! Axum router configuration for the marketplace API.

use crate::handlers::{auth, chat, checkout, dashboard, health, plugins, profile, purchases, webhook};
use crate::middleware::{maintenance_guard, MAINTENANCE_PATH};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  /health, GET /maintenance
/// - POST /api/chat
/// - /api/auth: signup, login, logout, user, callback
/// - POST|GET /api/checkout
/// - POST /api/webhooks/stripe
/// - /api/plugins: list, mine, create, get, update, delete, ownership
/// - GET  /api/purchases
/// - GET  /api/dashboard/stats, /api/dashboard/revenue
/// - /api/profile: get, notifications, api-keys
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/user", get(auth::current_user))
        .route("/callback", get(auth::callback));

    let plugin_routes = Router::new()
        .route("/", get(plugins::list_plugins).post(plugins::create_plugin))
        .route("/mine", get(plugins::list_my_plugins))
        .route(
            "/{id}",
            get(plugins::get_plugin)
                .patch(plugins::update_plugin)
                .delete(plugins::delete_plugin),
        )
        .route("/{id}/ownership", get(plugins::ownership));

    let dashboard_routes = Router::new()
        .route("/stats", get(dashboard::stats))
        .route("/revenue", get(dashboard::revenue));

    let profile_routes = Router::new()
        .route("/", get(profile::get_profile))
        .route("/notifications", patch(profile::update_notifications))
        .route(
            "/api-keys",
            get(profile::list_api_keys).post(profile::create_api_key),
        )
        .route("/api-keys/{id}", delete(profile::revoke_api_key));

    let api_routes = Router::new()
        .route("/chat", post(chat::chat))
        .route(
            "/checkout",
            post(checkout::create_checkout).get(checkout::retrieve_checkout),
        )
        // Raw body, authenticated by signature
        .route("/webhooks/stripe", post(webhook::stripe_webhook))
        .route("/purchases", get(purchases::list_purchases))
        .nest("/auth", auth_routes)
        .nest("/plugins", plugin_routes)
        .nest("/dashboard", dashboard_routes)
        .nest("/profile", profile_routes);

    Router::new()
        .route("/health", get(health::health))
        .route(MAINTENANCE_PATH, get(health::maintenance))
        .nest("/api", api_routes)
        .fallback(health::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn_with_state(state.clone(), maintenance_guard)),
        )
        .with_state(state)
}
