//! # Supabase Configuration

use market_core::MarketError;
use std::env;

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. https://abc.supabase.co
    pub url: String,

    /// Public key used for auth calls made on behalf of a user
    pub anon_key: String,

    /// Server-side key for database access. Never sent to clients.
    pub service_role_key: String,
}

impl SupabaseConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    /// - `SUPABASE_SERVICE_ROLE_KEY`
    pub fn from_env() -> Result<Self, MarketError> {
        dotenvy::dotenv().ok();

        let required = |name: &str| {
            env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| MarketError::Configuration(format!("{} not set", name)))
        };

        let config = Self::new(
            required("SUPABASE_URL")?,
            required("SUPABASE_ANON_KEY")?,
            required("SUPABASE_SERVICE_ROLE_KEY")?,
        );
        config.validate()?;
        Ok(config)
    }

    pub fn new(
        url: impl Into<String>,
        anon_key: impl Into<String>,
        service_role_key: impl Into<String>,
    ) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            service_role_key: service_role_key.into(),
        }
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(MarketError::Configuration(
                "SUPABASE_URL must be an http(s) URL".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.url, path)
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let config = SupabaseConfig::new("https://abc.supabase.co/", "anon", "service");
        assert!(config.validate().is_ok());
        assert_eq!(config.rest_url("plugins"), "https://abc.supabase.co/rest/v1/plugins");
        assert_eq!(config.auth_url("user"), "https://abc.supabase.co/auth/v1/user");
    }

    #[test]
    fn test_rejects_bare_host() {
        let config = SupabaseConfig::new("abc.supabase.co", "anon", "service");
        assert!(config.validate().is_err());
    }
}
