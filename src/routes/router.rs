//! Router Configuration
//!
//! Combines all route groups into a single Axum router.
//!
//! # Route Order
//!
//! 1. Realtime WebSocket route
//! 2. API routes (social, chat, runs, quote)
//! 3. Static file serving
//! 4. Fallback handler (404)

use axum::Router;
use tower_http::services::ServeDir;

use crate::routes::api_routes::configure_api_routes;
use crate::server::state::AppState;

/// Create the Axum router with all routes configured
///
/// ## Realtime
///
/// - `GET /ws/dm/{peer_sub}` - WebSocket joining the DM room with that peer
///
/// ## API
///
/// See [`configure_api_routes`] for the request/response surface.
///
/// ## Static Files
///
/// `/static` serves the public directory.
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new().route(
        "/ws/dm/{peer_sub}",
        axum::routing::get({
            use crate::realtime::ws::ws_dm;
            ws_dm
        }),
    );

    let router = configure_api_routes(router);

    let router = router.nest_service("/static", ServeDir::new("static"));

    let router = router.fallback(|| async { "404 Not Found" });

    router.with_state(app_state)
}
