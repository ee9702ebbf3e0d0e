//! Auth delegation. Every operation is forwarded to the auth provider;
//! the server only hands tokens back (JSON for API clients, a cookie for
//! browser sessions).

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppJson, AppQuery, CurrentUser, ACCESS_TOKEN_COOKIE};
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use market_core::{AuthSession, AuthUser, Credentials};
use serde::Deserialize;
use tracing::{info, instrument, warn};

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.is_production())
        .build()
}

#[instrument(skip(state, credentials), fields(email = %credentials.email))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(credentials): AppJson<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.auth.sign_up(&credentials).await?;
    info!("Signed up {}", outcome.user.id);
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[instrument(skip(state, jar, credentials), fields(email = %credentials.email))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(credentials): AppJson<Credentials>,
) -> ApiResult<(CookieJar, Json<AuthSession>)> {
    let session = state.auth.sign_in(&credentials).await?;
    let jar = jar.add(session_cookie(&state, session.access_token.clone()));
    Ok((jar, Json(session)))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    user: CurrentUser,
) -> ApiResult<(CookieJar, StatusCode)> {
    state.auth.sign_out(&user.access_token).await?;
    info!("Signed out {}", user.id());
    let jar = jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"));
    Ok((jar, StatusCode::NO_CONTENT))
}

pub async fn current_user(user: CurrentUser) -> Json<AuthUser> {
    Json(user.user)
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub code_verifier: Option<String>,
}

/// Only same-site paths are followed; anything else lands on `/`.
/// Browsers drop tabs and newlines from `Location`, so `/\t/host` would
/// become `//host`: whitespace and control characters are refused outright.
pub fn safe_next_path(next: Option<&str>) -> &str {
    match next {
        Some(path) if is_local_path(path) => path,
        Some(other) => {
            warn!("Ignoring unsafe redirect target: {}", other);
            "/"
        }
        None => "/",
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(|c| c.is_control() || c.is_whitespace())
}

/// OAuth redirect target: exchange the code, set the session cookie and
/// send the browser on to `next`
#[instrument(skip(state, jar, params))]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    AppQuery(params): AppQuery<CallbackParams>,
) -> ApiResult<(CookieJar, Redirect)> {
    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

    let session = state
        .auth
        .exchange_code(code, params.code_verifier.as_deref())
        .await?;
    info!("OAuth sign-in for {}", session.user.id);

    let jar = jar.add(session_cookie(&state, session.access_token));
    let target = safe_next_path(params.next.as_deref()).to_string();
    Ok((jar, Redirect::temporary(&target)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_path() {
        assert_eq!(safe_next_path(Some("/dashboard")), "/dashboard");
        assert_eq!(safe_next_path(Some("/plugins?tab=mine")), "/plugins?tab=mine");
        assert_eq!(safe_next_path(Some("https://evil.example")), "/");
        assert_eq!(safe_next_path(Some("//evil.example")), "/");
        assert_eq!(safe_next_path(Some("/\\evil.example")), "/");
        assert_eq!(safe_next_path(None), "/");
    }

    #[test]
    fn test_safe_next_path_refuses_stripped_characters() {
        assert_eq!(safe_next_path(Some("/\t/evil.example")), "/");
        assert_eq!(safe_next_path(Some("/\r\n/evil.example")), "/");
        assert_eq!(safe_next_path(Some("/ /evil.example")), "/");
        assert_eq!(safe_next_path(Some("/\u{0}/evil.example")), "/");
        assert_eq!(safe_next_path(Some("/settings%20page")), "/settings%20page");
    }
}
