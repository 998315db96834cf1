//! Server Initialization
//!
//! Wires the store, repositories, hub, and router together into one Axum
//! application.
//!
//! # Initialization Steps
//!
//! 1. Create the table store (in-memory backend)
//! 2. Build the repositories on top of it
//! 3. Construct the connection hub (single, explicitly owned instance)
//! 4. Build the verifier and quote client from configuration
//! 5. Assemble the router with the shared state

use std::sync::Arc;

use axum::Router;

use crate::dm::DmService;
use crate::quotes::QuoteClient;
use crate::realtime::ConnectionHub;
use crate::routes::create_router;
use crate::runs::RunsRepo;
use crate::server::config;
use crate::server::state::AppState;
use crate::social::SocialRepo;
use crate::store::{MemoryStore, TableStore};

/// Create and configure the Axum application
pub async fn create_app() -> Router<()> {
    tracing::info!("initializing lagoon backend");

    // The in-memory backend keeps a local server self-contained; a remote
    // single-table backend slots in behind the same trait.
    let store: Arc<dyn TableStore> = Arc::new(MemoryStore::new());
    tracing::warn!("using in-memory table store; data does not survive restarts");

    let repo = SocialRepo::new(store.clone());
    let runs = RunsRepo::new(store);
    let hub = Arc::new(ConnectionHub::new());
    let dm = DmService::new(repo.clone(), hub.clone());

    let state = AppState {
        repo,
        runs,
        dm,
        hub,
        verifier: config::load_verifier(),
        quotes: QuoteClient::new(),
    };

    tracing::info!("state and routes configured");
    create_router(state)
}
