//! Social HTTP Handlers
//!
//! The feed, like/repost, user search, and connection entry points. Feed
//! listing and user search are public reads; everything else requires a
//! verified identity.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::Error;

use super::SocialRepo;

#[derive(Debug, Deserialize)]
pub struct PostIn {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct LikeIn {
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RepostIn {
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub target_sub: String,
}

fn default_feed_limit() -> usize {
    20
}

fn default_search_limit() -> usize {
    8
}

/// Create a post on the global feed
pub async fn create_post(
    State(repo): State<SocialRepo>,
    AuthUser(claims): AuthUser,
    Json(data): Json<PostIn>,
) -> Result<Json<serde_json::Value>, Error> {
    let text = data.text.trim();
    if text.is_empty() {
        return Err(Error::validation("text", "Text required"));
    }
    let post = repo
        .create_post(&claims.sub, claims.display_name(), text)
        .await?;
    Ok(Json(serde_json::json!({ "post": post })))
}

/// Public read of the global feed, newest first, cursor-paginated
pub async fn list_feed(
    State(repo): State<SocialRepo>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let page = repo.list_feed(query.limit, query.cursor.as_deref()).await?;
    Ok(Json(serde_json::json!({
        "items": page.items,
        "next": page.next,
    })))
}

/// Toggle the caller's like on a post
pub async fn toggle_like(
    State(repo): State<SocialRepo>,
    AuthUser(claims): AuthUser,
    Json(data): Json<LikeIn>,
) -> Result<Json<serde_json::Value>, Error> {
    let outcome = repo.toggle_like(&data.post_id, &claims.sub).await?;
    Ok(Json(serde_json::json!({ "liked": outcome.liked })))
}

/// Repost; each call increments the counter
pub async fn repost(
    State(repo): State<SocialRepo>,
    AuthUser(claims): AuthUser,
    Json(data): Json<RepostIn>,
) -> Result<Json<serde_json::Value>, Error> {
    repo.repost(&data.post_id, &claims.sub).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Public substring search over known profiles
pub async fn search_users(
    State(repo): State<SocialRepo>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let items = repo.search_users_local(&query.q, query.limit).await?;
    Ok(Json(serde_json::json!({ "items": items })))
}

/// Connect the caller to another user (mirrored edge)
pub async fn connect_users(
    State(repo): State<SocialRepo>,
    AuthUser(claims): AuthUser,
    Query(query): Query<ConnectQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    repo.connect_users(&claims.sub, &query.target_sub).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Return the caller's identity and refresh their profile record
///
/// The upsert on every authenticated identity read keeps profiles current
/// without a dedicated registration step.
pub async fn me(
    State(repo): State<SocialRepo>,
    AuthUser(claims): AuthUser,
) -> Result<Json<serde_json::Value>, Error> {
    repo.upsert_profile(&claims.sub, &claims.email, claims.given_name.as_deref())
        .await?;
    Ok(Json(serde_json::json!({
        "sub": claims.sub,
        "email": claims.email,
        "given_name": claims.given_name,
    })))
}
