//! Assistant chat. There is no model behind it; every conversation gets
//! the same canned reply.

use crate::error::{ApiError, ApiResult};
use crate::extractors::AppJson;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CANNED_REPLY: &str = "Thanks for your message! The plugin assistant is not available yet. \
     In the meantime, browse the marketplace or check the docs of the plugin you are using.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    pub created_at: DateTime<Utc>,
}

pub async fn chat(AppJson(request): AppJson<ChatRequest>) -> ApiResult<Json<ChatResponse>> {
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("At least one message is required"));
    }
    debug!("Chat request with {} messages", request.messages.len());

    Ok(Json(ChatResponse {
        message: ChatMessage {
            role: "assistant".to_string(),
            content: CANNED_REPLY.to_string(),
        },
        created_at: Utc::now(),
    }))
}
