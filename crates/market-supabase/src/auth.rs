//! # Hosted Auth
//!
//! [`AuthProvider`] over the GoTrue endpoints. Calls are made with the
//! anon key; user-scoped calls add the caller's access token.

use crate::config::SupabaseConfig;
use async_trait::async_trait;
use market_core::{
    AuthProvider, AuthSession, AuthUser, Credentials, MarketError, MarketResult, SignUpOutcome,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<GoTrueUser> for AuthUser {
    fn from(user: GoTrueUser) -> Self {
        AuthUser {
            id: user.id,
            email: user.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: GoTrueUser,
}

impl From<GoTrueSession> for AuthSession {
    fn from(session: GoTrueSession) -> Self {
        AuthSession {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
            user: session.user.into(),
        }
    }
}

/// Sign-up returns a session when confirmation is disabled, a bare user
/// otherwise
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(GoTrueSession),
    User(GoTrueUser),
}

#[derive(Debug, Deserialize)]
struct GoTrueError {
    #[serde(default, alias = "msg", alias = "error_description")]
    message: Option<String>,
}

#[derive(Clone)]
pub struct SupabaseAuth {
    config: SupabaseConfig,
    http: Client,
}

impl SupabaseAuth {
    pub fn new(config: SupabaseConfig) -> MarketResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MarketError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    fn request(&self, builder: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        builder
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token.unwrap_or(&self.config.anon_key))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> MarketResult<T> {
        let body = self.send_raw(builder).await?;
        serde_json::from_str(&body).map_err(|e| {
            MarketError::Serialization(format!("Failed to parse auth response: {}", e))
        })
    }

    async fn send_raw(&self, builder: RequestBuilder) -> MarketResult<String> {
        let response = builder
            .send()
            .await
            .map_err(|e| MarketError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MarketError::NetworkError(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<GoTrueError>(&body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        debug!("Auth service rejected request: status={}, message={}", status, message);

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MarketError::Unauthenticated(message),
            // GoTrue answers bad credentials and invalid codes with 400
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                MarketError::InvalidRequest(message)
            }
            _ => MarketError::ProviderError {
                provider: "supabase-auth".to_string(),
                message,
            },
        })
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn authenticate(&self, access_token: &str) -> MarketResult<AuthUser> {
        let builder = self.request(
            self.http.get(self.config.auth_url("user")),
            Some(access_token),
        );
        let user: GoTrueUser = self.send(builder).await.map_err(|e| match e {
            MarketError::InvalidRequest(message) => MarketError::Unauthenticated(message),
            other => other,
        })?;
        Ok(user.into())
    }

    #[instrument(skip(self, credentials))]
    async fn sign_up(&self, credentials: &Credentials) -> MarketResult<SignUpOutcome> {
        let builder = self.request(
            self.http
                .post(self.config.auth_url("signup"))
                .json(&json!({ "email": credentials.email, "password": credentials.password })),
            None,
        );

        Ok(match self.send::<SignUpResponse>(builder).await? {
            SignUpResponse::Session(session) => {
                let session = AuthSession::from(session);
                SignUpOutcome {
                    user: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::User(user) => SignUpOutcome {
                user: user.into(),
                session: None,
            },
        })
    }

    #[instrument(skip(self, credentials))]
    async fn sign_in(&self, credentials: &Credentials) -> MarketResult<AuthSession> {
        let builder = self.request(
            self.http
                .post(self.config.auth_url("token"))
                .query(&[("grant_type", "password")])
                .json(&json!({ "email": credentials.email, "password": credentials.password })),
            None,
        );

        let session: GoTrueSession = self.send(builder).await.map_err(|e| match e {
            MarketError::InvalidRequest(_) => {
                MarketError::Unauthenticated("Invalid login credentials".to_string())
            }
            other => other,
        })?;
        Ok(session.into())
    }

    async fn sign_out(&self, access_token: &str) -> MarketResult<()> {
        let builder = self.request(
            self.http.post(self.config.auth_url("logout")),
            Some(access_token),
        );
        match self.send_raw(builder).await {
            Ok(_) => Ok(()),
            // Already expired tokens are signed out anyway
            Err(MarketError::Unauthenticated(message)) => {
                warn!("Sign-out with stale token: {}", message);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, code, code_verifier))]
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> MarketResult<AuthSession> {
        let builder = self.request(
            self.http
                .post(self.config.auth_url("token"))
                .query(&[("grant_type", "pkce")])
                .json(&json!({ "auth_code": code, "code_verifier": code_verifier })),
            None,
        );
        let session: GoTrueSession = self.send(builder).await.map_err(|e| match e {
            MarketError::InvalidRequest(message) => MarketError::Unauthenticated(message),
            other => other,
        })?;
        Ok(session.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn auth(server: &MockServer) -> SupabaseAuth {
        SupabaseAuth::new(SupabaseConfig::new(server.uri(), "anon-key", "service-key")).unwrap()
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "dev@example.com".to_string(),
            password: "hunter22".to_string(),
        }
    }

    fn session_body() -> serde_json::Value {
        json!({
            "access_token": "jwt-abc",
            "refresh_token": "ref-1",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "usr-1", "email": "dev@example.com" }
        })
    }

    #[tokio::test]
    async fn test_authenticate_uses_caller_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer jwt-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "usr-1", "email": "dev@example.com", "aud": "authenticated"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("Authorization", "Bearer expired"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "msg": "invalid JWT"
            })))
            .mount(&server)
            .await;

        let auth = auth(&server);
        let user = auth.authenticate("jwt-abc").await.unwrap();
        assert_eq!(user.id, "usr-1");

        let err = auth.authenticate("expired").await.unwrap_err();
        assert!(matches!(err, MarketError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_sign_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_partial_json(json!({ "email": "dev@example.com" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let session = auth(&server).sign_in(&credentials()).await.unwrap();
        assert_eq!(session.access_token, "jwt-abc");
        assert_eq!(session.expires_in, Some(3600));
        assert_eq!(session.user.email.as_deref(), Some("dev@example.com"));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let err = auth(&server).sign_in(&credentials()).await.unwrap_err();
        assert!(matches!(err, MarketError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_sign_up_without_confirmation_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "usr-2", "email": "new@example.com", "confirmation_sent_at": "2024-05-01T10:00:00Z"
            })))
            .mount(&server)
            .await;

        let outcome = auth(&server).sign_up(&credentials()).await.unwrap();
        assert_eq!(outcome.user.id, "usr-2");
        assert!(outcome.session.is_none());
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "pkce"))
            .and(body_partial_json(json!({ "auth_code": "code-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let session = auth(&server).exchange_code("code-1", None).await.unwrap();
        assert_eq!(session.user.id, "usr-1");
    }

    #[tokio::test]
    async fn test_sign_out_tolerates_expired_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        assert!(auth(&server).sign_out("old").await.is_ok());
    }
}
