//! # Profile Types
//!
//! Per-user settings stored next to the auth account.

use crate::error::{MarketError, MarketResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const API_KEY_PREFIX: &str = "pm_live_";
pub const API_KEY_VISIBLE_LEN: usize = 12;
pub const MAX_API_KEYS: usize = 10;
pub const MAX_API_KEY_NAME_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default = "default_true")]
    pub email_purchases: bool,
    #[serde(default = "default_true")]
    pub email_updates: bool,
    #[serde(default)]
    pub email_marketing: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_purchases: true,
            email_updates: true,
            email_marketing: false,
        }
    }
}

/// Partial update of notification preferences
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NotificationPatch {
    #[serde(default)]
    pub email_purchases: Option<bool>,
    #[serde(default)]
    pub email_updates: Option<bool>,
    #[serde(default)]
    pub email_marketing: Option<bool>,
}

impl NotificationPatch {
    pub fn apply(&self, prefs: &mut NotificationPreferences) {
        if let Some(v) = self.email_purchases {
            prefs.email_purchases = v;
        }
        if let Some(v) = self.email_updates {
            prefs.email_updates = v;
        }
        if let Some(v) = self.email_marketing {
            prefs.email_marketing = v;
        }
    }
}

/// Stored record of a mock API key. The secret itself is never kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    /// First characters of the secret, for recognition in the UI
    pub prefix: String,
    pub created_at: DateTime<Utc>,
}

/// Returned exactly once, at creation time
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedApiKey {
    #[serde(flatten)]
    pub key: ApiKey,
    pub secret: String,
}

impl ApiKey {
    pub fn generate(name: &str) -> MarketResult<GeneratedApiKey> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_API_KEY_NAME_LEN {
            return Err(MarketError::Validation(format!(
                "API key name must be 1-{} characters",
                MAX_API_KEY_NAME_LEN
            )));
        }

        let secret = format!("{}{}", API_KEY_PREFIX, Uuid::new_v4().simple());
        let key = ApiKey {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            prefix: secret[..API_KEY_VISIBLE_LEN].to_string(),
            created_at: Utc::now(),
        };
        Ok(GeneratedApiKey { key, secret })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Same as the auth user id
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Payment customer, created on first purchase
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    #[serde(default)]
    pub notification_preferences: NotificationPreferences,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            email,
            display_name: None,
            stripe_customer_id: None,
            notification_preferences: NotificationPreferences::default(),
            api_keys: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_api_key(&mut self, key: ApiKey) -> MarketResult<()> {
        if self.api_keys.len() >= MAX_API_KEYS {
            return Err(MarketError::Validation(format!(
                "At most {} API keys allowed",
                MAX_API_KEYS
            )));
        }
        self.api_keys.push(key);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn revoke_api_key(&mut self, key_id: &str) -> MarketResult<()> {
        let before = self.api_keys.len();
        self.api_keys.retain(|k| k.id != key_id);
        if self.api_keys.len() == before {
            return Err(MarketError::NotFound(format!("API key {}", key_id)));
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_api_key() {
        let generated = ApiKey::generate(" CI token ").unwrap();

        assert!(generated.secret.starts_with(API_KEY_PREFIX));
        assert_eq!(generated.secret.len(), API_KEY_PREFIX.len() + 32);
        assert_eq!(generated.key.prefix, &generated.secret[..API_KEY_VISIBLE_LEN]);
        assert_eq!(generated.key.name, "CI token");

        assert!(ApiKey::generate("  ").is_err());
    }

    #[test]
    fn test_api_key_limit_and_revoke() {
        let mut profile = Profile::new("u1", None);
        for i in 0..MAX_API_KEYS {
            let key = ApiKey::generate(&format!("key {}", i)).unwrap().key;
            profile.add_api_key(key).unwrap();
        }
        let extra = ApiKey::generate("one too many").unwrap().key;
        assert!(profile.add_api_key(extra).is_err());

        let first = profile.api_keys[0].id.clone();
        profile.revoke_api_key(&first).unwrap();
        assert_eq!(profile.api_keys.len(), MAX_API_KEYS - 1);
        assert!(matches!(
            profile.revoke_api_key(&first),
            Err(MarketError::NotFound(_))
        ));
    }

    #[test]
    fn test_notification_patch() {
        let mut prefs = NotificationPreferences::default();
        NotificationPatch {
            email_marketing: Some(true),
            email_updates: Some(false),
            ..NotificationPatch::default()
        }
        .apply(&mut prefs);

        assert!(prefs.email_purchases);
        assert!(!prefs.email_updates);
        assert!(prefs.email_marketing);
    }
}
