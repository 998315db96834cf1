//! Route Configuration
//!
//! Router assembly: the realtime WebSocket route, the API route table,
//! static file serving, and the 404 fallback.

pub mod api_routes;
pub mod router;

pub use router::create_router;
