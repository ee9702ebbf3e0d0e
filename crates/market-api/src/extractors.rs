//! # Extractors
//!
//! - [`CurrentUser`]: the caller behind `Authorization: Bearer <token>` (or
//!   the session cookie set by the OAuth callback), resolved through the
//!   auth provider. `Option<CurrentUser>` for routes where auth is optional.
//! - [`AppJson`] / [`AppQuery`]: `Json` / `Query` with rejections turned
//!   into JSON 400 responses.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, OptionalFromRequestParts, Query, Request,
    },
    http::{header, request::Parts},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use market_core::{AuthUser, MarketError};
use serde::de::DeserializeOwned;

/// Cookie holding the access token after an OAuth callback
pub const ACCESS_TOKEN_COOKIE: &str = "pm_access_token";

/// An authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: AuthUser,
    /// Token the user was resolved from (needed for sign-out)
    pub access_token: String,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

fn access_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        return value
            .strip_prefix("Bearer ")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
    }

    CookieJar::from_headers(&parts.headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let access_token = access_token(parts).ok_or(ApiError::Unauthorized)?;

        let user = state
            .auth
            .authenticate(&access_token)
            .await
            .map_err(|e| match e {
                MarketError::Unauthenticated(_) => ApiError::Unauthorized,
                other => ApiError::Market(other),
            })?;

        Ok(CurrentUser { user, access_token })
    }
}

impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    /// Anonymous when no token is sent or the token is rejected
    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(ApiError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// A `Json<T>` wrapper that converts deserialization errors into a JSON 400
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(AppJson(value))
    }
}

/// A `Query<T>` wrapper with the same treatment
pub struct AppQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(AppQuery(value))
    }
}
