//! DM HTTP Handlers
//!
//! Sends arrive here (request/response), are persisted, and are fanned out
//! to the WebSocket channel by the service. History and conversation
//! listing are plain repository reads.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::Error;

use super::DmService;

#[derive(Debug, Deserialize)]
pub struct DmIn {
    pub to_sub: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct DmHistoryQuery {
    pub with_sub: String,
    #[serde(default = "default_dm_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct ConversationsQuery {
    #[serde(default = "default_conversations_limit")]
    pub limit: usize,
}

fn default_dm_limit() -> usize {
    50
}

fn default_conversations_limit() -> usize {
    20
}

/// Send a DM: persist, then push to the conversation room
pub async fn send_dm(
    State(service): State<DmService>,
    AuthUser(claims): AuthUser,
    Json(data): Json<DmIn>,
) -> Result<Json<serde_json::Value>, Error> {
    if data.text.trim().is_empty() {
        return Err(Error::validation("text", "Text required"));
    }
    let message = service
        .send_and_deliver(&claims.sub, &data.to_sub, &data.text)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true, "msg": message })))
}

/// Conversation history with one peer, newest first
pub async fn list_dm(
    State(service): State<DmService>,
    AuthUser(claims): AuthUser,
    Query(query): Query<DmHistoryQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let items = service
        .history(&claims.sub, &query.with_sub, query.limit)
        .await?;
    Ok(Json(serde_json::json!({ "items": items })))
}

/// The caller's conversations with last-message summaries
pub async fn list_conversations(
    State(service): State<DmService>,
    AuthUser(claims): AuthUser,
    Query(query): Query<ConversationsQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let conversations = service.conversations(&claims.sub, query.limit).await?;
    Ok(Json(serde_json::json!({ "conversations": conversations })))
}
