//! # Hosted Store
//!
//! Implements every store trait over PostgREST. Aggregates and the
//! download counter are Postgres functions called through `/rpc`.
//!
//! Status transitions are conditional writes: the PATCH filters on the
//! status that was read, so a concurrent webhook cannot move a row
//! backwards. When the filter misses, the row is re-read and the
//! transition is decided again.

use crate::client::SupabaseClient;
use crate::rows::{plugin_patch_body, PluginRow, PurchaseRow, PLUGINS, PROFILES, PURCHASES};
use async_trait::async_trait;
use market_core::{
    DashboardStats, MarketError, MarketResult, Plugin, PluginPatch, PluginQuery, PluginStore,
    Profile, ProfileStore, Purchase, PurchaseStatus, PurchaseStore, RevenuePoint, StatsStore,
    StatusUpdate, TransitionOutcome, TransitionReport,
};
use serde_json::json;
use tracing::{debug, instrument, warn};

const MAX_TRANSITION_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn purchase_by(&self, column: &str, value: &str) -> MarketResult<Option<PurchaseRow>> {
        let rows: Vec<PurchaseRow> = self
            .client
            .select(
                PURCHASES,
                &[(column, format!("eq.{}", value)), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn plugin_by(&self, column: &str, value: &str) -> MarketResult<Option<Plugin>> {
        let rows: Vec<PluginRow> = self
            .client
            .select(
                PLUGINS,
                &[(column, format!("eq.{}", value)), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.into_iter().next().map(Plugin::from))
    }

    /// Apply `update` to one purchase row with optimistic concurrency
    async fn advance_row(
        &self,
        mut row: PurchaseRow,
        update: &StatusUpdate,
        payment_intent_id: Option<&str>,
    ) -> MarketResult<TransitionReport> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let mut purchase = Purchase::from(row);
            let from = purchase.status;
            let outcome = purchase.advance(update.to, payment_intent_id);
            if outcome != TransitionOutcome::Applied {
                return Ok(TransitionReport::new(&purchase, from, update.to, outcome));
            }

            let body = json!({
                "status": purchase.status,
                "payment_intent_id": purchase.payment_intent_id,
                "updated_at": purchase.updated_at,
            });
            let updated: Vec<PurchaseRow> = self
                .client
                .update(
                    PURCHASES,
                    &[
                        ("id", format!("eq.{}", purchase.id)),
                        ("status", format!("eq.{}", from)),
                    ],
                    &body,
                )
                .await?;

            if !updated.is_empty() {
                return Ok(TransitionReport::new(&purchase, from, update.to, outcome));
            }

            debug!("Purchase {} changed concurrently, re-reading", purchase.id);
            row = self
                .purchase_by("id", &purchase.id)
                .await?
                .ok_or_else(|| MarketError::NotFound(format!("purchase {}", purchase.id)))?;
        }

        Err(MarketError::Database(
            "Purchase status kept changing during transition".to_string(),
        ))
    }
}

/// Query-string filters for a listing query
pub fn plugin_filters(query: &PluginQuery) -> Vec<(&'static str, String)> {
    let mut filters = Vec::new();

    if query.public_only {
        filters.push(("status", "in.(active,published)".to_string()));
    }
    if let Some(status) = query.status {
        filters.push(("status", format!("eq.{}", status)));
    }
    if let Some(category) = &query.category {
        filters.push(("categories", format!("cs.{{{}}}", category)));
    }
    if let Some(developer_id) = &query.developer_id {
        filters.push(("developer_id", format!("eq.{}", developer_id)));
    }
    if let Some(search) = &query.search {
        // Strip PostgREST pattern and list syntax
        let term: String = search
            .chars()
            .filter(|c| !matches!(c, '*' | '%' | ',' | '(' | ')'))
            .collect();
        let term = term.trim();
        if !term.is_empty() {
            filters.push(("name", format!("ilike.*{}*", term)));
        }
    }

    filters.push(("order", "created_at.desc,slug.asc".to_string()));
    filters.push(("limit", query.effective_limit().to_string()));
    filters.push(("offset", query.effective_offset().to_string()));
    filters
}

#[async_trait]
impl PluginStore for SupabaseStore {
    #[instrument(skip(self, plugin), fields(slug = %plugin.slug))]
    async fn insert_plugin(&self, plugin: &Plugin) -> MarketResult<Plugin> {
        let rows: Vec<PluginRow> = self
            .client
            .insert(PLUGINS, &PluginRow::from(plugin))
            .await?;
        rows.into_iter()
            .next()
            .map(Plugin::from)
            .ok_or_else(|| MarketError::Database("Insert returned no row".to_string()))
    }

    async fn get_plugin(&self, id: &str) -> MarketResult<Option<Plugin>> {
        self.plugin_by("id", id).await
    }

    async fn get_plugin_by_slug(&self, slug: &str) -> MarketResult<Option<Plugin>> {
        self.plugin_by("slug", slug).await
    }

    async fn list_plugins(&self, query: &PluginQuery) -> MarketResult<Vec<Plugin>> {
        let rows: Vec<PluginRow> = self
            .client
            .select(PLUGINS, &plugin_filters(query))
            .await?;
        Ok(rows.into_iter().map(Plugin::from).collect())
    }

    #[instrument(skip(self, patch))]
    async fn update_plugin(&self, id: &str, patch: &PluginPatch) -> MarketResult<Option<Plugin>> {
        let rows: Vec<PluginRow> = self
            .client
            .update(
                PLUGINS,
                &[("id", format!("eq.{}", id))],
                &plugin_patch_body(patch),
            )
            .await?;
        Ok(rows.into_iter().next().map(Plugin::from))
    }

    #[instrument(skip(self))]
    async fn delete_plugin(&self, id: &str) -> MarketResult<bool> {
        let rows: Vec<PluginRow> = self
            .client
            .delete(PLUGINS, &[("id", format!("eq.{}", id))])
            .await?;
        Ok(!rows.is_empty())
    }

    async fn increment_downloads(&self, id: &str) -> MarketResult<()> {
        let _: serde_json::Value = self
            .client
            .rpc("increment_plugin_downloads", &json!({ "plugin_id": id }))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PurchaseStore for SupabaseStore {
    #[instrument(skip(self, purchase), fields(session_id = %purchase.session_id))]
    async fn insert_purchase(&self, purchase: &Purchase) -> MarketResult<()> {
        let _: Vec<PurchaseRow> = self
            .client
            .insert(PURCHASES, &PurchaseRow::from(purchase))
            .await?;
        Ok(())
    }

    async fn find_completed_purchase(
        &self,
        user_id: &str,
        plugin_id: &str,
    ) -> MarketResult<Option<Purchase>> {
        let rows: Vec<PurchaseRow> = self
            .client
            .select(
                PURCHASES,
                &[
                    ("user_id", format!("eq.{}", user_id)),
                    ("plugin_id", format!("eq.{}", plugin_id)),
                    ("status", format!("eq.{}", PurchaseStatus::Completed)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(Purchase::from))
    }

    async fn list_purchases_for_user(&self, user_id: &str) -> MarketResult<Vec<Purchase>> {
        let rows: Vec<PurchaseRow> = self
            .client
            .select(
                PURCHASES,
                &[
                    ("user_id", format!("eq.{}", user_id)),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Purchase::from).collect())
    }

    async fn get_purchase_by_session(&self, session_id: &str) -> MarketResult<Option<Purchase>> {
        Ok(self
            .purchase_by("session_id", session_id)
            .await?
            .map(Purchase::from))
    }

    #[instrument(skip(self, update), fields(to = %update.to))]
    async fn transition_by_session(
        &self,
        session_id: &str,
        update: &StatusUpdate,
    ) -> MarketResult<Option<TransitionReport>> {
        let Some(row) = self.purchase_by("session_id", session_id).await? else {
            return Ok(None);
        };
        let report = self
            .advance_row(row, update, update.payment_intent_id.as_deref())
            .await?;
        Ok(Some(report))
    }

    #[instrument(skip(self, update), fields(to = %update.to))]
    async fn transition_by_payment_intent(
        &self,
        payment_intent_id: &str,
        update: &StatusUpdate,
    ) -> MarketResult<Vec<TransitionReport>> {
        let rows: Vec<PurchaseRow> = self
            .client
            .select(
                PURCHASES,
                &[("payment_intent_id", format!("eq.{}", payment_intent_id))],
            )
            .await?;

        if rows.is_empty() {
            warn!("No purchase references payment intent {}", payment_intent_id);
        }

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            reports.push(self.advance_row(row, update, None).await?);
        }
        Ok(reports)
    }
}

#[async_trait]
impl ProfileStore for SupabaseStore {
    async fn get_profile(&self, user_id: &str) -> MarketResult<Option<Profile>> {
        let rows: Vec<Profile> = self
            .client
            .select(PROFILES, &[("id", format!("eq.{}", user_id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_profile(&self, profile: &Profile) -> MarketResult<Profile> {
        let rows: Vec<Profile> = self.client.upsert(PROFILES, profile).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| MarketError::Database("Upsert returned no row".to_string()))
    }
}

#[async_trait]
impl StatsStore for SupabaseStore {
    async fn dashboard_stats(&self, developer_id: &str) -> MarketResult<DashboardStats> {
        let stats: Option<DashboardStats> = self
            .client
            .rpc("get_dashboard_stats", &json!({ "developer_id": developer_id }))
            .await?;
        Ok(stats.unwrap_or_default())
    }

    async fn revenue_series(
        &self,
        developer_id: &str,
        months: u32,
    ) -> MarketResult<Vec<RevenuePoint>> {
        let points: Option<Vec<RevenuePoint>> = self
            .client
            .rpc(
                "get_revenue_series",
                &json!({ "developer_id": developer_id, "months": months }),
            )
            .await?;
        Ok(points.unwrap_or_default())
    }
}
