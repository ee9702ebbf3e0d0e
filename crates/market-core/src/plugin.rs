//! # Plugin Types
//!
//! Marketplace listings, their create/update inputs and the schema rules
//! those inputs must satisfy before reaching the database.

use crate::error::{MarketError, MarketResult};
use crate::price::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_SLUG_LEN: usize = 64;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
/// $100,000 in cents
pub const MAX_PRICE_AMOUNT: i64 = 10_000_000;
pub const MAX_CATEGORIES: usize = 5;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Listing lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    /// Work in progress, only visible to the developer
    #[default]
    Draft,
    /// Submitted for review
    Pending,
    /// Approved and purchasable
    Active,
    /// Approved, purchasable and featured in the public listing
    Published,
}

impl PluginStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginStatus::Draft => "draft",
            PluginStatus::Pending => "pending",
            PluginStatus::Active => "active",
            PluginStatus::Published => "published",
        }
    }

    /// Active and published listings appear publicly and can be bought
    pub fn is_public(&self) -> bool {
        matches!(self, PluginStatus::Active | PluginStatus::Published)
    }
}

impl std::fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A marketplace listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub status: PluginStatus,
    /// Category slugs
    #[serde(default)]
    pub categories: Vec<String>,
    /// Owning developer account
    pub developer_id: String,
    #[serde(default)]
    pub downloads: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plugin {
    /// Build a new listing from validated input
    pub fn from_new(input: NewPlugin, developer_id: impl Into<String>) -> MarketResult<Self> {
        input.validate()?;
        let now = Utc::now();
        let slug = input.resolved_slug()?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            slug,
            name: input.name.trim().to_string(),
            description: input.description,
            price: input.price,
            status: input.status,
            categories: input.categories,
            developer_id: developer_id.into(),
            downloads: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_public(&self) -> bool {
        self.status.is_public()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.developer_id == user_id
    }

    /// Fails with `NotPurchasable` unless the listing is public and priced
    pub fn ensure_purchasable(&self) -> MarketResult<()> {
        if !self.status.is_public() {
            return Err(MarketError::NotPurchasable {
                plugin_id: self.id.clone(),
                reason: format!("status is {}", self.status),
            });
        }
        if self.price.amount <= 0 {
            return Err(MarketError::NotPurchasable {
                plugin_id: self.id.clone(),
                reason: "plugin has no price".to_string(),
            });
        }
        Ok(())
    }
}

/// Create input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlugin {
    pub name: String,
    /// Derived from the name when omitted
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub status: PluginStatus,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl NewPlugin {
    pub fn new(name: impl Into<String>, price: Price) -> Self {
        Self {
            name: name.into(),
            slug: None,
            description: String::new(),
            price,
            status: PluginStatus::Draft,
            categories: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: PluginStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn validate(&self) -> MarketResult<()> {
        validate_name(&self.name)?;
        if let Some(slug) = &self.slug {
            validate_slug(slug)?;
        }
        validate_description(&self.description)?;
        validate_price(&self.price)?;
        validate_categories(&self.categories)
    }

    /// The explicit slug, or one derived from the name
    pub fn resolved_slug(&self) -> MarketResult<String> {
        let slug = match &self.slug {
            Some(slug) => slug.clone(),
            None => slugify(&self.name),
        };
        validate_slug(&slug)?;
        Ok(slug)
    }
}

/// Partial update input. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PluginStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

impl PluginPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.status.is_none()
            && self.categories.is_none()
    }

    pub fn validate(&self) -> MarketResult<()> {
        if self.is_empty() {
            return Err(MarketError::Validation("No fields to update".to_string()));
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(slug) = &self.slug {
            validate_slug(slug)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(price) = &self.price {
            validate_price(price)?;
        }
        if let Some(categories) = &self.categories {
            validate_categories(categories)?;
        }
        Ok(())
    }

    /// Apply to a plugin in place, bumping `updated_at`
    pub fn apply(&self, plugin: &mut Plugin) {
        if let Some(name) = &self.name {
            plugin.name = name.trim().to_string();
        }
        if let Some(slug) = &self.slug {
            plugin.slug = slug.clone();
        }
        if let Some(description) = &self.description {
            plugin.description = description.clone();
        }
        if let Some(price) = self.price {
            plugin.price = price;
        }
        if let Some(status) = self.status {
            plugin.status = status;
        }
        if let Some(categories) = &self.categories {
            plugin.categories = categories.clone();
        }
        plugin.updated_at = Utc::now();
    }
}

/// Listing filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginQuery {
    #[serde(default)]
    pub status: Option<PluginStatus>,
    #[serde(default)]
    pub category: Option<String>,
    /// Case-insensitive substring of the name
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub developer_id: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    /// Restrict to active/published listings
    #[serde(skip)]
    pub public_only: bool,
}

impl PluginQuery {
    /// Query for the public catalogue
    pub fn public() -> Self {
        Self {
            public_only: true,
            ..Self::default()
        }
    }

    /// Query for everything a developer owns
    pub fn by_developer(developer_id: impl Into<String>) -> Self {
        Self {
            developer_id: Some(developer_id.into()),
            ..Self::default()
        }
    }

    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    /// Filter predicate (pagination is applied separately)
    pub fn matches(&self, plugin: &Plugin) -> bool {
        if self.public_only && !plugin.is_public() {
            return false;
        }
        if let Some(status) = self.status {
            if plugin.status != status {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !plugin.categories.iter().any(|c| c == category) {
                return false;
            }
        }
        if let Some(developer_id) = &self.developer_id {
            if &plugin.developer_id != developer_id {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !plugin
                .name
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Development seed catalogue, loaded from `config/plugins.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginCatalog {
    #[serde(default)]
    pub plugins: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub developer_id: String,
    #[serde(flatten)]
    pub plugin: NewPlugin,
}

impl PluginCatalog {
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Validate every entry and turn it into a listing
    pub fn into_plugins(self) -> MarketResult<Vec<Plugin>> {
        self.plugins
            .into_iter()
            .map(|entry| Plugin::from_new(entry.plugin, entry.developer_id))
            .collect()
    }
}

/// Lowercase the name and collapse every non-alphanumeric run into `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

pub fn validate_slug(slug: &str) -> MarketResult<()> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        return Err(MarketError::Validation(format!(
            "Slug must be 1-{} characters",
            MAX_SLUG_LEN
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(MarketError::Validation(format!(
            "Slug may only contain a-z, 0-9 and '-': {}",
            slug
        )));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(MarketError::Validation(format!(
            "Slug may not start or end with '-': {}",
            slug
        )));
    }
    Ok(())
}

fn validate_name(name: &str) -> MarketResult<()> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(MarketError::Validation(format!(
            "Name must be 1-{} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> MarketResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(MarketError::Validation(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(())
}

fn validate_price(price: &Price) -> MarketResult<()> {
    if price.amount < 0 || price.amount > MAX_PRICE_AMOUNT {
        return Err(MarketError::Validation(format!(
            "Price must be between 0 and {}",
            MAX_PRICE_AMOUNT
        )));
    }
    Ok(())
}

fn validate_categories(categories: &[String]) -> MarketResult<()> {
    if categories.len() > MAX_CATEGORIES {
        return Err(MarketError::Validation(format!(
            "At most {} categories allowed",
            MAX_CATEGORIES
        )));
    }
    categories.iter().try_for_each(|c| validate_slug(c))
}
