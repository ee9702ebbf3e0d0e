//! # Application State
//!
//! Shared state for the Axum application: the store, auth and payment
//! backends behind their traits, plus configuration.

use market_core::{
    BoxedAuthProvider, BoxedMarketStore, BoxedPaymentStrategy, CheckoutUrls, InMemoryStore,
    PluginCatalog, StaticAuthProvider,
};
use market_stripe::{StripeCheckoutStrategy, REQUIRED_WEBHOOK_EVENTS};
use market_supabase::{SupabaseAuth, SupabaseClient, SupabaseConfig, SupabaseStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, used for checkout redirects
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Redirect every request to the maintenance page
    pub maintenance_mode: bool,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            maintenance_mode: std::env::var("MAINTENANCE_MODE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            environment: "development".to_string(),
            maintenance_mode: false,
        }
    }
}

/// `true`/`1` (any case, surrounding whitespace ignored)
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: BoxedMarketStore,
    pub auth: BoxedAuthProvider,
    pub payments: BoxedPaymentStrategy,
    /// Default checkout redirect targets
    pub urls: CheckoutUrls,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        store: BoxedMarketStore,
        auth: BoxedAuthProvider,
        payments: BoxedPaymentStrategy,
        config: AppConfig,
    ) -> Self {
        Self {
            urls: CheckoutUrls::new(&config.base_url),
            store,
            auth,
            payments,
            config,
        }
    }

    /// Wire the real backends from environment variables.
    ///
    /// Without Supabase credentials, non-production environments fall back
    /// to the in-memory store seeded from `config/plugins.toml`.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let stripe = StripeCheckoutStrategy::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
        info!(
            "Stripe ready (test mode: {}); webhook events: {}",
            stripe.config().is_test_mode(),
            REQUIRED_WEBHOOK_EVENTS.join(", ")
        );

        let (store, auth): (BoxedMarketStore, BoxedAuthProvider) = match SupabaseConfig::from_env()
        {
            Ok(supabase) => {
                info!("Using Supabase at {}", supabase.url);
                let client = SupabaseClient::new(supabase.clone())?;
                (
                    Arc::new(SupabaseStore::new(client)),
                    Arc::new(SupabaseAuth::new(supabase)?),
                )
            }
            Err(e) if config.is_production() => {
                anyhow::bail!("Supabase is required in production: {}", e);
            }
            Err(e) => {
                warn!("{}; using the in-memory store", e);
                let store = InMemoryStore::with_plugins(load_plugin_catalog()?);
                (Arc::new(store), Arc::new(StaticAuthProvider::new()))
            }
        };

        Ok(Self::new(store, auth, Arc::new(stripe), config))
    }
}

/// Load the development plugin catalogue from config file
fn load_plugin_catalog() -> anyhow::Result<Vec<market_core::Plugin>> {
    let config_paths = [
        "config/plugins.toml",
        "../config/plugins.toml",
        "../../config/plugins.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let plugins = PluginCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?
                .into_plugins()
                .map_err(|e| anyhow::anyhow!("Invalid plugin in {}: {}", path, e))?;
            info!("Loaded {} plugins from {}", plugins.len(), path);
            return Ok(plugins);
        }
    }

    warn!("No plugin catalogue found, starting empty");
    Ok(Vec::new())
}
