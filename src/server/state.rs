//! Application State Management
//!
//! This module defines the application state structure and implements the
//! `FromRef` traits for Axum state extraction.
//!
//! # Architecture
//!
//! `AppState` is the central state container, holding:
//! - The social repository (the table's only writer)
//! - The DM service (persist-then-broadcast orchestration)
//! - The connection hub (live room registry)
//! - The runs repository, token verifier, and quote client
//!
//! The hub is constructed once at startup and reaches every
//! connection-accepting and message-sending entry point through this
//! struct - there is no module-level singleton, and its internal map sits
//! behind its own lock.
//!
//! # State Extraction
//!
//! The `FromRef` implementations let handlers extract just the piece of
//! state they need (`State<SocialRepo>`, `State<DmService>`, ...) without
//! taking the whole `AppState`.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::TokenVerifier;
use crate::dm::DmService;
use crate::quotes::QuoteClient;
use crate::realtime::ConnectionHub;
use crate::runs::RunsRepo;
use crate::social::SocialRepo;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Social repository over the single-table store
    pub repo: SocialRepo,

    /// Assistant run records
    pub runs: RunsRepo,

    /// DM orchestration: persistence plus live fan-out
    pub dm: DmService,

    /// Live connection registry, shared with every WebSocket task
    pub hub: Arc<ConnectionHub>,

    /// Bearer-credential verifier
    pub verifier: TokenVerifier,

    /// Upstream market-quote client
    pub quotes: QuoteClient,
}

impl FromRef<AppState> for SocialRepo {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for RunsRepo {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.runs.clone()
    }
}

impl FromRef<AppState> for DmService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.dm.clone()
    }
}

impl FromRef<AppState> for Arc<ConnectionHub> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.hub.clone()
    }
}

impl FromRef<AppState> for TokenVerifier {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for QuoteClient {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.quotes.clone()
    }
}
