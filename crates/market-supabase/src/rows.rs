//! Table row shapes. Prices are stored as `*_cents` + `currency` columns.

use chrono::{DateTime, Utc};
use market_core::{
    Currency, Plugin, PluginPatch, PluginStatus, Price, Purchase, PurchaseStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PLUGINS: &str = "plugins";
pub const PURCHASES: &str = "purchases";
pub const PROFILES: &str = "profiles";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRow {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub currency: Currency,
    pub status: PluginStatus,
    #[serde(default)]
    pub categories: Vec<String>,
    pub developer_id: String,
    #[serde(default)]
    pub downloads: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Plugin> for PluginRow {
    fn from(plugin: &Plugin) -> Self {
        Self {
            id: plugin.id.clone(),
            slug: plugin.slug.clone(),
            name: plugin.name.clone(),
            description: Some(plugin.description.clone()),
            price_cents: plugin.price.amount,
            currency: plugin.price.currency,
            status: plugin.status,
            categories: plugin.categories.clone(),
            developer_id: plugin.developer_id.clone(),
            downloads: plugin.downloads,
            created_at: plugin.created_at,
            updated_at: plugin.updated_at,
        }
    }
}

impl From<PluginRow> for Plugin {
    fn from(row: PluginRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            description: row.description.unwrap_or_default(),
            price: Price::from_cents(row.price_cents, row.currency),
            status: row.status,
            categories: row.categories,
            developer_id: row.developer_id,
            downloads: row.downloads,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PATCH body holding only the columns the patch touches
pub fn plugin_patch_body(patch: &PluginPatch) -> Map<String, Value> {
    let mut body = Map::new();
    if let Some(name) = &patch.name {
        body.insert("name".into(), Value::from(name.trim()));
    }
    if let Some(slug) = &patch.slug {
        body.insert("slug".into(), Value::from(slug.as_str()));
    }
    if let Some(description) = &patch.description {
        body.insert("description".into(), Value::from(description.as_str()));
    }
    if let Some(price) = patch.price {
        body.insert("price_cents".into(), Value::from(price.amount));
        body.insert("currency".into(), Value::from(price.currency.as_str()));
    }
    if let Some(status) = patch.status {
        body.insert("status".into(), Value::from(status.as_str()));
    }
    if let Some(categories) = &patch.categories {
        body.insert("categories".into(), Value::from(categories.clone()));
    }
    body.insert("updated_at".into(), Value::from(Utc::now().to_rfc3339()));
    body
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRow {
    pub id: String,
    pub plugin_id: String,
    pub user_id: String,
    pub status: PurchaseStatus,
    pub session_id: String,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    pub amount_cents: i64,
    #[serde(default)]
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Purchase> for PurchaseRow {
    fn from(purchase: &Purchase) -> Self {
        Self {
            id: purchase.id.clone(),
            plugin_id: purchase.plugin_id.clone(),
            user_id: purchase.user_id.clone(),
            status: purchase.status,
            session_id: purchase.session_id.clone(),
            payment_intent_id: purchase.payment_intent_id.clone(),
            amount_cents: purchase.amount.amount,
            currency: purchase.amount.currency,
            created_at: purchase.created_at,
            updated_at: purchase.updated_at,
        }
    }
}

impl From<PurchaseRow> for Purchase {
    fn from(row: PurchaseRow) -> Self {
        Self {
            id: row.id,
            plugin_id: row.plugin_id,
            user_id: row.user_id,
            status: row.status,
            session_id: row.session_id,
            payment_intent_id: row.payment_intent_id,
            amount: Price::from_cents(row.amount_cents, row.currency),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::NewPlugin;

    #[test]
    fn test_plugin_row_mapping() {
        let plugin = Plugin::from_new(
            NewPlugin::new("Linter", Price::from_cents(900, Currency::EUR))
                .with_status(PluginStatus::Active)
                .with_category("devtools"),
            "dev-1",
        )
        .unwrap();

        let row = PluginRow::from(&plugin);
        assert_eq!(row.price_cents, 900);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["currency"], "eur");
        assert_eq!(json["status"], "active");

        assert_eq!(Plugin::from(row), plugin);
    }

    #[test]
    fn test_patch_body_only_touches_given_columns() {
        let patch = PluginPatch {
            price: Some(Price::from_cents(500, Currency::USD)),
            ..PluginPatch::default()
        };
        let body = plugin_patch_body(&patch);

        assert_eq!(body["price_cents"], 500);
        assert_eq!(body["currency"], "usd");
        assert!(body.contains_key("updated_at"));
        assert!(!body.contains_key("name"));
        assert!(!body.contains_key("status"));
    }
}
