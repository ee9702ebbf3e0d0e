mod common;

use axum::http::{header, HeaderValue, StatusCode};
use common::*;
use serde_json::{json, Value};

fn credentials() -> Value {
    json!({ "email": "new@example.com", "password": "hunter22" })
}

#[tokio::test]
async fn test_signup_then_login() {
    let app = spawn_app().await;

    let signup = app.server.post("/api/auth/signup").json(&credentials()).await;
    assert_eq!(signup.status_code(), StatusCode::CREATED);
    let body: Value = signup.json();
    assert_eq!(body["user"]["email"], "new@example.com");

    let duplicate = app.server.post("/api/auth/signup").json(&credentials()).await;
    assert_eq!(duplicate.status_code(), StatusCode::BAD_REQUEST);

    let login = app.server.post("/api/auth/login").json(&credentials()).await;
    assert_eq!(login.status_code(), StatusCode::OK);
    assert!(login
        .header(header::SET_COOKIE)
        .to_str()
        .unwrap()
        .starts_with("pm_access_token="));

    let session: Value = login.json();
    let token = session["access_token"].as_str().unwrap();

    let me: Value = app
        .server
        .get("/api/auth/user")
        .authorization_bearer(token)
        .await
        .json();
    assert_eq!(me["email"], "new@example.com");
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = spawn_app().await;
    app.server.post("/api/auth/signup").json(&credentials()).await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "new@example.com", "password": "wrong-one" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_current_user_requires_token() {
    let app = spawn_app().await;

    let response = app.server.get("/api/auth/user").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/api/auth/user")
        .authorization_bearer(BUYER_TOKEN)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["id"], BUYER_ID);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/auth/logout")
        .authorization_bearer(BUYER_TOKEN)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = app
        .server
        .get("/api/auth/user")
        .authorization_bearer(BUYER_TOKEN)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_sets_cookie_and_redirects() {
    let app = spawn_app().await;

    let response = app
        .server
        .get("/api/auth/callback")
        .add_query_param("code", BUYER_TOKEN)
        .add_query_param("next", "/dashboard")
        .await;

    assert_eq!(response.status_code(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.header(header::LOCATION), "/dashboard");

    let set_cookie = response.header(header::SET_COOKIE);
    let cookie = set_cookie.to_str().unwrap().split(';').next().unwrap().to_string();
    assert!(cookie.starts_with("pm_access_token="));

    // The cookie alone authenticates
    let me = app
        .server
        .get("/api/auth/user")
        .add_header(header::COOKIE, HeaderValue::from_str(&cookie).unwrap())
        .await;
    assert_eq!(me.status_code(), StatusCode::OK);
    let body: Value = me.json();
    assert_eq!(body["id"], BUYER_ID);
}

#[tokio::test]
async fn test_callback_ignores_external_next() {
    let app = spawn_app().await;

    let response = app
        .server
        .get("/api/auth/callback")
        .add_query_param("code", BUYER_TOKEN)
        .add_query_param("next", "https://evil.example/phish")
        .await;

    assert_eq!(response.status_code(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.header(header::LOCATION), "/");
}

#[tokio::test]
async fn test_callback_errors() {
    let app = spawn_app().await;

    let missing = app.server.get("/api/auth/callback").await;
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);

    let invalid = app
        .server
        .get("/api/auth/callback")
        .add_query_param("code", "bogus")
        .await;
    assert_eq!(invalid.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_ignores_next_with_control_characters() {
    let app = spawn_app().await;

    let response = app
        .server
        .get("/api/auth/callback")
        .add_query_param("code", BUYER_TOKEN)
        .add_query_param("next", "/\t/evil.example")
        .await;

    assert_eq!(response.status_code(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.header(header::LOCATION), "/");
}
