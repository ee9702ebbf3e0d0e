//! # market-core
//!
//! Core types and traits for the plugin marketplace.
//!
//! This crate provides:
//! - `Plugin`, `NewPlugin`, `PluginPatch` and their schema validation
//! - `Purchase` and the one-directional `PurchaseStatus` state machine
//! - `Profile` with notification preferences and mock API keys
//! - Dashboard aggregates and their display formatters
//! - `PaymentStrategy`, `AuthProvider` and the store traits that keep the
//!   hosted services behind seams
//! - `InMemoryStore` / `StaticAuthProvider` for development and tests
//! - `MarketError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use market_core::{CheckoutRequest, PaymentStrategy, Purchase};
//!
//! plugin.ensure_purchasable()?;
//! let request = CheckoutRequest::for_plugin(&plugin, &user.id, success_url, cancel_url);
//! let session = strategy.create_checkout(&request).await?;
//! store
//!     .insert_purchase(&Purchase::pending(&plugin.id, &user.id, &session.session_id, plugin.price))
//!     .await?;
//! ```

pub mod auth;
pub mod checkout;
pub mod dashboard;
pub mod error;
pub mod memory;
pub mod plugin;
pub mod price;
pub mod profile;
pub mod purchase;
pub mod store;
pub mod strategy;

// Re-exports for convenience
pub use auth::{AuthProvider, AuthSession, AuthUser, BoxedAuthProvider, Credentials, SignUpOutcome};
pub use checkout::{
    CheckoutRequest, CheckoutSession, CheckoutStatus, PaymentStatus, WebhookEvent,
    WebhookEventType,
};
pub use dashboard::{
    format_change, format_compact, format_currency, DashboardStats, FormattedDashboard,
    RevenuePoint,
};
pub use error::{MarketError, MarketResult};
pub use memory::{InMemoryStore, StaticAuthProvider};
pub use plugin::{NewPlugin, Plugin, PluginCatalog, PluginPatch, PluginQuery, PluginStatus};
pub use price::{Currency, Price};
pub use profile::{ApiKey, GeneratedApiKey, NotificationPatch, NotificationPreferences, Profile};
pub use purchase::{Purchase, PurchaseStatus, StatusUpdate, TransitionOutcome, TransitionReport};
pub use store::{BoxedMarketStore, MarketStore, PluginStore, ProfileStore, PurchaseStore, StatsStore};
pub use strategy::{validate_redirect_url, BoxedPaymentStrategy, CheckoutUrls, PaymentStrategy};
