//! # In-Memory Backends
//!
//! `InMemoryStore` and `StaticAuthProvider` stand in for the hosted
//! database and auth service in development and tests.

use crate::auth::{AuthProvider, AuthSession, AuthUser, Credentials, SignUpOutcome};
use crate::dashboard::{DashboardStats, RevenuePoint};
use crate::error::{MarketError, MarketResult};
use crate::plugin::{Plugin, PluginPatch, PluginQuery};
use crate::profile::Profile;
use crate::purchase::{Purchase, StatusUpdate, TransitionReport};
use crate::store::{PluginStore, ProfileStore, PurchaseStore, StatsStore};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    plugins: HashMap<String, Plugin>,
    purchases: Vec<Purchase>,
    profiles: HashMap<String, Profile>,
}

/// Thread-safe in-memory implementation of every store trait
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with the given listings
    pub fn with_plugins(plugins: impl IntoIterator<Item = Plugin>) -> Self {
        let tables = Tables {
            plugins: plugins.into_iter().map(|p| (p.id.clone(), p)).collect(),
            ..Tables::default()
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Snapshot of all purchases (test inspection)
    pub async fn purchases(&self) -> Vec<Purchase> {
        self.tables.read().await.purchases.clone()
    }
}

#[async_trait]
impl PluginStore for InMemoryStore {
    async fn insert_plugin(&self, plugin: &Plugin) -> MarketResult<Plugin> {
        let mut tables = self.tables.write().await;
        if tables.plugins.values().any(|p| p.slug == plugin.slug) {
            return Err(MarketError::Validation(format!(
                "Slug already taken: {}",
                plugin.slug
            )));
        }
        tables.plugins.insert(plugin.id.clone(), plugin.clone());
        Ok(plugin.clone())
    }

    async fn get_plugin(&self, id: &str) -> MarketResult<Option<Plugin>> {
        Ok(self.tables.read().await.plugins.get(id).cloned())
    }

    async fn get_plugin_by_slug(&self, slug: &str) -> MarketResult<Option<Plugin>> {
        let tables = self.tables.read().await;
        Ok(tables.plugins.values().find(|p| p.slug == slug).cloned())
    }

    async fn list_plugins(&self, query: &PluginQuery) -> MarketResult<Vec<Plugin>> {
        let tables = self.tables.read().await;
        let mut plugins: Vec<Plugin> = tables
            .plugins
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        plugins.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.slug.cmp(&b.slug)));

        Ok(plugins
            .into_iter()
            .skip(query.effective_offset() as usize)
            .take(query.effective_limit() as usize)
            .collect())
    }

    async fn update_plugin(&self, id: &str, patch: &PluginPatch) -> MarketResult<Option<Plugin>> {
        let mut tables = self.tables.write().await;
        if let Some(slug) = &patch.slug {
            if tables.plugins.values().any(|p| &p.slug == slug && p.id != id) {
                return Err(MarketError::Validation(format!("Slug already taken: {}", slug)));
            }
        }
        Ok(tables.plugins.get_mut(id).map(|plugin| {
            patch.apply(plugin);
            plugin.clone()
        }))
    }

    async fn delete_plugin(&self, id: &str) -> MarketResult<bool> {
        Ok(self.tables.write().await.plugins.remove(id).is_some())
    }

    async fn increment_downloads(&self, id: &str) -> MarketResult<()> {
        let mut tables = self.tables.write().await;
        let plugin = tables
            .plugins
            .get_mut(id)
            .ok_or_else(|| MarketError::plugin_not_found(id))?;
        plugin.downloads += 1;
        Ok(())
    }
}

#[async_trait]
impl PurchaseStore for InMemoryStore {
    async fn insert_purchase(&self, purchase: &Purchase) -> MarketResult<()> {
        self.tables.write().await.purchases.push(purchase.clone());
        Ok(())
    }

    async fn find_completed_purchase(
        &self,
        user_id: &str,
        plugin_id: &str,
    ) -> MarketResult<Option<Purchase>> {
        let tables = self.tables.read().await;
        Ok(tables
            .purchases
            .iter()
            .find(|p| p.user_id == user_id && p.plugin_id == plugin_id && p.is_completed())
            .cloned())
    }

    async fn list_purchases_for_user(&self, user_id: &str) -> MarketResult<Vec<Purchase>> {
        let tables = self.tables.read().await;
        let mut purchases: Vec<Purchase> = tables
            .purchases
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(purchases)
    }

    async fn get_purchase_by_session(&self, session_id: &str) -> MarketResult<Option<Purchase>> {
        let tables = self.tables.read().await;
        Ok(tables
            .purchases
            .iter()
            .find(|p| p.session_id == session_id)
            .cloned())
    }

    async fn transition_by_session(
        &self,
        session_id: &str,
        update: &StatusUpdate,
    ) -> MarketResult<Option<TransitionReport>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .purchases
            .iter_mut()
            .find(|p| p.session_id == session_id)
            .map(|purchase| {
                let from = purchase.status;
                let outcome = purchase.advance(update.to, update.payment_intent_id.as_deref());
                TransitionReport::new(purchase, from, update.to, outcome)
            }))
    }

    async fn transition_by_payment_intent(
        &self,
        payment_intent_id: &str,
        update: &StatusUpdate,
    ) -> MarketResult<Vec<TransitionReport>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .purchases
            .iter_mut()
            .filter(|p| p.payment_intent_id.as_deref() == Some(payment_intent_id))
            .map(|purchase| {
                let from = purchase.status;
                let outcome = purchase.advance(update.to, None);
                TransitionReport::new(purchase, from, update.to, outcome)
            })
            .collect())
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_profile(&self, user_id: &str) -> MarketResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> MarketResult<Profile> {
        let mut tables = self.tables.write().await;
        tables.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile.clone())
    }
}

#[async_trait]
impl StatsStore for InMemoryStore {
    async fn dashboard_stats(&self, developer_id: &str) -> MarketResult<DashboardStats> {
        let tables = self.tables.read().await;
        let owned: HashMap<&str, &Plugin> = tables
            .plugins
            .values()
            .filter(|p| p.developer_id == developer_id)
            .map(|p| (p.id.as_str(), p))
            .collect();

        let sales: Vec<&Purchase> = tables
            .purchases
            .iter()
            .filter(|p| p.is_completed() && owned.contains_key(p.plugin_id.as_str()))
            .collect();
        let buyers: HashSet<&str> = sales.iter().map(|p| p.user_id.as_str()).collect();

        Ok(DashboardStats {
            total_revenue: sales.iter().map(|p| p.amount.amount).sum(),
            total_downloads: owned.values().map(|p| p.downloads).sum(),
            active_users: buyers.len() as i64,
            plugin_count: owned.len() as i64,
            previous_revenue: 0,
            previous_downloads: 0,
        })
    }

    async fn revenue_series(
        &self,
        developer_id: &str,
        months: u32,
    ) -> MarketResult<Vec<RevenuePoint>> {
        let tables = self.tables.read().await;
        let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
        for purchase in tables.purchases.iter().filter(|p| p.is_completed()) {
            let owned = tables
                .plugins
                .get(&purchase.plugin_id)
                .is_some_and(|p| p.developer_id == developer_id);
            if owned {
                *buckets
                    .entry(purchase.created_at.format("%Y-%m").to_string())
                    .or_default() += purchase.amount.amount;
            }
        }

        let skip = buckets.len().saturating_sub(months as usize);
        Ok(buckets
            .into_iter()
            .skip(skip)
            .map(|(period, revenue)| RevenuePoint { period, revenue })
            .collect())
    }
}

struct Account {
    user: AuthUser,
    password: String,
}

/// Token table standing in for the hosted auth service
#[derive(Default, Clone)]
pub struct StaticAuthProvider {
    tokens: Arc<RwLock<HashMap<String, AuthUser>>>,
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl StaticAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixed token for a user
    pub async fn insert_token(&self, token: impl Into<String>, user: AuthUser) {
        self.tokens.write().await.insert(token.into(), user);
    }

    async fn issue(&self, user: AuthUser) -> AuthSession {
        let token = format!("tok_{}", Uuid::new_v4().simple());
        self.tokens.write().await.insert(token.clone(), user.clone());
        AuthSession {
            access_token: token,
            refresh_token: None,
            expires_in: Some(3600),
            user,
        }
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn authenticate(&self, access_token: &str) -> MarketResult<AuthUser> {
        self.tokens
            .read()
            .await
            .get(access_token)
            .cloned()
            .ok_or_else(|| MarketError::Unauthenticated("Invalid or expired token".to_string()))
    }

    async fn sign_up(&self, credentials: &Credentials) -> MarketResult<SignUpOutcome> {
        let email = credentials.email.trim().to_lowercase();
        if email.is_empty() || credentials.password.len() < 6 {
            return Err(MarketError::Validation(
                "Email and a password of at least 6 characters are required".to_string(),
            ));
        }
        let user = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&email) {
                return Err(MarketError::Validation("User already registered".to_string()));
            }
            let user = AuthUser {
                id: Uuid::new_v4().to_string(),
                email: Some(email.clone()),
            };
            accounts.insert(
                email,
                Account {
                    user: user.clone(),
                    password: credentials.password.clone(),
                },
            );
            user
        };
        let session = self.issue(user.clone()).await;
        Ok(SignUpOutcome {
            user,
            session: Some(session),
        })
    }

    async fn sign_in(&self, credentials: &Credentials) -> MarketResult<AuthSession> {
        let email = credentials.email.trim().to_lowercase();
        let user = {
            let accounts = self.accounts.read().await;
            match accounts.get(&email) {
                Some(account) if account.password == credentials.password => account.user.clone(),
                _ => {
                    return Err(MarketError::Unauthenticated(
                        "Invalid login credentials".to_string(),
                    ))
                }
            }
        };
        Ok(self.issue(user).await)
    }

    async fn sign_out(&self, access_token: &str) -> MarketResult<()> {
        self.tokens.write().await.remove(access_token);
        Ok(())
    }

    async fn exchange_code(&self, code: &str, _code_verifier: Option<&str>) -> MarketResult<AuthSession> {
        // Codes are pre-registered tokens in this backend
        let user = self.authenticate(code).await?;
        self.tokens.write().await.remove(code);
        Ok(self.issue(user).await)
    }
}
