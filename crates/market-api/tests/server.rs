mod common;

use axum::http::{header, StatusCode};
use common::*;
use market_api::AppConfig;
use serde_json::{json, Value};

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "plugin-market");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = spawn_app().await;

    let response = app.server.get("/api/nope").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_maintenance_mode_redirects_everything() {
    let app = spawn_app_with(AppConfig {
        maintenance_mode: true,
        ..AppConfig::default()
    })
    .await;

    for uri in ["/", "/health", "/api/plugins", "/api/nope"] {
        let response = app.server.get(uri).await;
        assert_eq!(response.status_code(), StatusCode::TEMPORARY_REDIRECT, "{}", uri);
        assert_eq!(response.header(header::LOCATION), "/maintenance");
    }

    let response = app
        .server
        .post("/api/chat")
        .json(&json!({ "messages": [{ "role": "user", "content": "hi" }] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::TEMPORARY_REDIRECT);

    let page = app.server.get("/maintenance").await;
    assert_eq!(page.status_code(), StatusCode::OK);
    assert!(page.text().contains("maintenance"));
}

#[tokio::test]
async fn test_maintenance_page_reachable_when_off() {
    let app = spawn_app().await;

    let response = app.server.get("/api/plugins").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let page = app.server.get("/maintenance").await;
    assert_eq!(page.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_chat_canned_reply() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/chat")
        .json(&json!({ "messages": [{ "role": "user", "content": "Which plugin reviews code?" }] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"]["role"], "assistant");
    assert!(!body["message"]["content"].as_str().unwrap().is_empty());
    assert!(body["created_at"].is_string());
}

#[tokio::test]
async fn test_chat_rejects_empty_conversation() {
    let app = spawn_app().await;

    for body in [json!({ "messages": [] }), json!({})] {
        let response = app.server.post("/api/chat").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let error: Value = response.json();
        assert_eq!(error["code"], 400);
    }
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/chat")
        .text("{not json")
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
