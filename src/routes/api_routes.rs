//! API Route Handlers
//!
//! The request/response surface. Entry points requiring a verified identity
//! extract [`crate::auth::AuthUser`]; feed listing, user search, quotes,
//! and the health probe are public reads.
//!
//! # Routes
//!
//! ## Social Feed
//! - `POST /api/social/post` - create a post (auth)
//! - `GET  /api/social/feed` - list the feed, cursor-paginated (public)
//! - `POST /api/social/like` - toggle a like (auth)
//! - `POST /api/social/repost` - repost (auth)
//!
//! ## Users / Connections
//! - `GET  /api/chat/users` - substring profile search (public)
//! - `GET  /api/chat/connections` - conversation summaries (auth)
//! - `POST /api/chat/connect` - connect two users (auth)
//! - `GET  /api/me` - caller identity + profile refresh (auth)
//!
//! ## Direct Messages
//! - `POST /api/chat/dm` - send a DM, fan out to the room (auth)
//! - `GET  /api/chat/dm` - conversation history (auth)
//!
//! ## Runs / Quotes / Health
//! - `POST /api/runs`, `GET /api/runs`, `GET /api/usage-today` (auth)
//! - `GET  /api/quote` - resolve and fetch a market quote (public)
//! - `GET  /api/healthz` - liveness probe (public)

use axum::Json;
use axum::Router;

use crate::server::state::AppState;

/// Configure API routes
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        // Social feed
        .route(
            "/api/social/post",
            axum::routing::post(crate::social::handlers::create_post),
        )
        .route(
            "/api/social/feed",
            axum::routing::get(crate::social::handlers::list_feed),
        )
        .route(
            "/api/social/like",
            axum::routing::post(crate::social::handlers::toggle_like),
        )
        .route(
            "/api/social/repost",
            axum::routing::post(crate::social::handlers::repost),
        )
        // Users and connections
        .route(
            "/api/chat/users",
            axum::routing::get(crate::social::handlers::search_users),
        )
        .route(
            "/api/chat/connections",
            axum::routing::get(crate::dm::handlers::list_conversations),
        )
        .route(
            "/api/chat/connect",
            axum::routing::post(crate::social::handlers::connect_users),
        )
        .route("/api/me", axum::routing::get(crate::social::handlers::me))
        // Direct messages
        .route(
            "/api/chat/dm",
            axum::routing::post(crate::dm::handlers::send_dm)
                .get(crate::dm::handlers::list_dm),
        )
        // Assistant runs
        .route(
            "/api/runs",
            axum::routing::post(crate::runs::handlers::create_run)
                .get(crate::runs::handlers::list_runs),
        )
        .route(
            "/api/usage-today",
            axum::routing::get(crate::runs::handlers::usage_today),
        )
        // Market quotes
        .route("/api/quote", axum::routing::get(crate::quotes::get_quote))
        // Health probe
        .route("/api/healthz", axum::routing::get(healthz))
}

/// Liveness probe
async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}
