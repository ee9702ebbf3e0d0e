//! # Marketplace Error Types
//!
//! Typed error handling for the plugin marketplace.
//! Every fallible operation returns `Result<T, MarketError>`.
//!
//! Errors collapse into four HTTP categories: invalid client input (400),
//! unauthenticated (401), not found (404) and unexpected (500).

use thiserror::Error;

/// Core error type for all marketplace operations
#[derive(Debug, Error)]
pub enum MarketError {
    /// Schema validation failed on client input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed or inconsistent request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing, expired or rejected credentials
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Plugin does not exist (or is not visible to the caller)
    #[error("Plugin not found: {plugin_id}")]
    PluginNotFound { plugin_id: String },

    /// Any other missing resource (checkout session, API key, ...)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Plugin exists but cannot be bought
    #[error("Plugin {plugin_id} is not purchasable: {reason}")]
    NotPurchasable { plugin_id: String, reason: String },

    /// The user already holds a completed purchase for the plugin
    #[error("Plugin already owned: {plugin_id}")]
    AlreadyOwned { plugin_id: String },

    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Payment provider or auth service returned an error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with an upstream service
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Database service rejected or failed a query
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            MarketError::Validation(_) => 400,
            MarketError::InvalidRequest(_) => 400,
            MarketError::NotPurchasable { .. } => 400,
            MarketError::AlreadyOwned { .. } => 400,
            MarketError::WebhookVerificationFailed(_) => 400,
            MarketError::WebhookParseError(_) => 400,
            MarketError::Unauthenticated(_) => 401,
            MarketError::PluginNotFound { .. } => 404,
            MarketError::NotFound(_) => 404,
            MarketError::Configuration(_) => 500,
            MarketError::ProviderError { .. } => 500,
            MarketError::NetworkError(_) => 500,
            MarketError::Database(_) => 500,
            MarketError::Serialization(_) => 500,
            MarketError::Internal(_) => 500,
        }
    }

    /// Shorthand for a missing plugin
    pub fn plugin_not_found(plugin_id: impl Into<String>) -> Self {
        MarketError::PluginNotFound {
            plugin_id: plugin_id.into(),
        }
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        MarketError::Serialization(err.to_string())
    }
}

/// Result type alias for marketplace operations
pub type MarketResult<T> = Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(MarketError::Validation("name".into()).status_code(), 400);
        assert_eq!(
            MarketError::AlreadyOwned {
                plugin_id: "p".into()
            }
            .status_code(),
            400
        );
        assert_eq!(MarketError::Unauthenticated("no token".into()).status_code(), 401);
        assert_eq!(MarketError::plugin_not_found("x").status_code(), 404);
        assert_eq!(
            MarketError::ProviderError {
                provider: "stripe".into(),
                message: "boom".into()
            }
            .status_code(),
            500
        );
    }
}
