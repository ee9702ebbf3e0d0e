//! # REST Client
//!
//! Thin wrapper over the PostgREST endpoint. Every request carries the
//! service role key, so row level security is bypassed and ownership
//! checks happen in the API layer.

use crate::config::SupabaseConfig;
use market_core::{MarketError, MarketResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// `column=operator.value` pairs appended to the query string
pub type Filters<'a> = [(&'a str, String)];

/// Postgres unique violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl PostgrestError {
    /// Postgres names the violated constraint in `message`, the key in `details`
    fn mentions(&self, needle: &str) -> bool {
        [&self.message, &self.details]
            .into_iter()
            .flatten()
            .any(|text| text.contains(needle))
    }
}

#[derive(Clone)]
pub struct SupabaseClient {
    config: SupabaseConfig,
    http: Client,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> MarketResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MarketError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &Filters<'_>,
    ) -> MarketResult<Vec<T>> {
        let builder = self
            .http
            .get(self.config.rest_url(table))
            .query(&[("select", "*")])
            .query(filters);
        self.send(builder).await
    }

    pub async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> MarketResult<Vec<T>> {
        let builder = self
            .http
            .post(self.config.rest_url(table))
            .header("Prefer", "return=representation")
            .json(body);
        self.send(builder).await
    }

    /// Insert or merge on the primary key
    pub async fn upsert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> MarketResult<Vec<T>> {
        let builder = self
            .http
            .post(self.config.rest_url(table))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(body);
        self.send(builder).await
    }

    /// Returns the updated rows; empty when the filters matched nothing
    pub async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &Filters<'_>,
        body: &B,
    ) -> MarketResult<Vec<T>> {
        let builder = self
            .http
            .patch(self.config.rest_url(table))
            .query(filters)
            .header("Prefer", "return=representation")
            .json(body);
        self.send(builder).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &Filters<'_>,
    ) -> MarketResult<Vec<T>> {
        let builder = self
            .http
            .delete(self.config.rest_url(table))
            .query(filters)
            .header("Prefer", "return=representation");
        self.send(builder).await
    }

    /// Call a Postgres function
    pub async fn rpc<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        function: &str,
        args: &B,
    ) -> MarketResult<T> {
        let builder = self
            .http
            .post(self.config.rest_url(&format!("rpc/{}", function)))
            .json(args);
        self.send(builder).await
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> MarketResult<T> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| MarketError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MarketError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            return Err(map_error(status, &body));
        }

        debug!("PostgREST {} ({} bytes)", status, body.len());

        // 204 and empty RPC results
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| {
            MarketError::Serialization(format!("Failed to parse database response: {}", e))
        })
    }
}

fn map_error(status: StatusCode, body: &str) -> MarketError {
    let parsed = serde_json::from_str::<PostgrestError>(body).ok();

    if let Some(err) = parsed
        .as_ref()
        .filter(|e| e.code.as_deref() == Some(UNIQUE_VIOLATION))
    {
        warn!("Unique violation: {:?}", err.message);
        return if err.mentions("slug") {
            MarketError::Validation("Slug is already taken".to_string())
        } else {
            MarketError::Validation("Record already exists".to_string())
        };
    }

    error!("PostgREST error: status={}, body={}", status, body);
    let message = parsed
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("HTTP {}", status));
    MarketError::Database(message)
}
