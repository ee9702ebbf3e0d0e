//! # market-supabase
//!
//! Hosted backends for the plugin marketplace:
//!
//! - **SupabaseStore** implements the store traits over the PostgREST API
//! - **SupabaseAuth** implements `AuthProvider` over the GoTrue API
//!
//! ```rust,ignore
//! let config = SupabaseConfig::from_env()?;
//! let store = SupabaseStore::new(SupabaseClient::new(config.clone())?);
//! let auth = SupabaseAuth::new(config)?;
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod rows;
pub mod store;

pub use auth::SupabaseAuth;
pub use client::SupabaseClient;
pub use config::SupabaseConfig;
pub use store::SupabaseStore;
