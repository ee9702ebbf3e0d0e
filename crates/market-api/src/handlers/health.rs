use crate::error::ApiError;
use axum::{http::Uri, response::Html, response::IntoResponse, Json};

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "plugin-market",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Static page every request lands on while maintenance mode is on
pub async fn maintenance() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>Down for maintenance</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: #0f172a;">
    <div style="background: white; padding: 60px; border-radius: 16px; text-align: center;">
        <h1>We'll be right back</h1>
        <p style="color: #666;">Plugin Market is down for scheduled maintenance.</p>
    </div>
</body>
</html>
"#,
    )
}

/// JSON 404 for unmatched paths
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}
