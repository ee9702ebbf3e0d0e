//! # Auth Seam
//!
//! Authentication is delegated to a hosted auth service. The marketplace
//! only ever sees opaque access tokens and the user they resolve to.

use crate::error::MarketResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The caller behind a valid access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens handed back after sign-in or code exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

/// Email + password pair
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Outcome of a sign-up. Hosted services with email confirmation return
/// no session until the address is confirmed.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<AuthSession>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve an access token to its user. Invalid tokens yield
    /// `MarketError::Unauthenticated`.
    async fn authenticate(&self, access_token: &str) -> MarketResult<AuthUser>;

    async fn sign_up(&self, credentials: &Credentials) -> MarketResult<SignUpOutcome>;

    async fn sign_in(&self, credentials: &Credentials) -> MarketResult<AuthSession>;

    async fn sign_out(&self, access_token: &str) -> MarketResult<()>;

    /// Exchange an OAuth/PKCE authorization code for a session
    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> MarketResult<AuthSession>;
}

pub type BoxedAuthProvider = Arc<dyn AuthProvider>;
