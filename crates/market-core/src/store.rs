//! # Store Traits
//!
//! Persistence lives in a managed database. These traits are the only way
//! handlers reach it, so the hosted client and the in-memory store are
//! interchangeable.
//!
//! Purchases are written in two places only: `insert_purchase` at checkout
//! creation (always `pending`) and the two `transition_*` methods, which
//! the webhook path alone calls.

use crate::dashboard::{DashboardStats, RevenuePoint};
use crate::error::MarketResult;
use crate::plugin::{Plugin, PluginPatch, PluginQuery};
use crate::profile::Profile;
use crate::purchase::{Purchase, StatusUpdate, TransitionReport};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait PluginStore: Send + Sync {
    async fn insert_plugin(&self, plugin: &Plugin) -> MarketResult<Plugin>;

    async fn get_plugin(&self, id: &str) -> MarketResult<Option<Plugin>>;

    async fn get_plugin_by_slug(&self, slug: &str) -> MarketResult<Option<Plugin>>;

    async fn list_plugins(&self, query: &PluginQuery) -> MarketResult<Vec<Plugin>>;

    /// Returns `None` when no row matched
    async fn update_plugin(&self, id: &str, patch: &PluginPatch) -> MarketResult<Option<Plugin>>;

    /// Returns whether a row was deleted
    async fn delete_plugin(&self, id: &str) -> MarketResult<bool>;

    async fn increment_downloads(&self, id: &str) -> MarketResult<()>;
}

#[async_trait]
pub trait PurchaseStore: Send + Sync {
    async fn insert_purchase(&self, purchase: &Purchase) -> MarketResult<()>;

    async fn find_completed_purchase(
        &self,
        user_id: &str,
        plugin_id: &str,
    ) -> MarketResult<Option<Purchase>>;

    async fn list_purchases_for_user(&self, user_id: &str) -> MarketResult<Vec<Purchase>>;

    async fn get_purchase_by_session(&self, session_id: &str) -> MarketResult<Option<Purchase>>;

    /// Advance the purchase created for `session_id`. `None` when no
    /// purchase references the session.
    async fn transition_by_session(
        &self,
        session_id: &str,
        update: &StatusUpdate,
    ) -> MarketResult<Option<TransitionReport>>;

    /// Advance every purchase whose payment intent equals
    /// `payment_intent_id`, and no other.
    async fn transition_by_payment_intent(
        &self,
        payment_intent_id: &str,
        update: &StatusUpdate,
    ) -> MarketResult<Vec<TransitionReport>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> MarketResult<Option<Profile>>;

    async fn upsert_profile(&self, profile: &Profile) -> MarketResult<Profile>;
}

/// Read-only aggregates computed by the database
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn dashboard_stats(&self, developer_id: &str) -> MarketResult<DashboardStats>;

    /// Monthly revenue, oldest first, at most `months` entries
    async fn revenue_series(&self, developer_id: &str, months: u32)
        -> MarketResult<Vec<RevenuePoint>>;
}

/// Everything the API needs from the database
pub trait MarketStore: PluginStore + PurchaseStore + ProfileStore + StatsStore {}

impl<T> MarketStore for T where T: PluginStore + PurchaseStore + ProfileStore + StatsStore {}

pub type BoxedMarketStore = Arc<dyn MarketStore>;
