//! Shared helpers for integration tests

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use http_body_util::BodyExt;

use lagoon::auth::{mint_token, TokenVerifier};
use lagoon::dm::DmService;
use lagoon::quotes::QuoteClient;
use lagoon::realtime::ConnectionHub;
use lagoon::routes::create_router;
use lagoon::runs::RunsRepo;
use lagoon::server::AppState;
use lagoon::social::SocialRepo;
use lagoon::store::{MemoryStore, TableStore};

pub const SECRET: &str = "integration-secret";
pub const AUDIENCE: &str = "lagoon-test";

/// Router over a fresh in-memory store, plus the hub for attaching
/// test connections
pub fn test_app() -> (Router, Arc<ConnectionHub>) {
    let store: Arc<dyn TableStore> = Arc::new(MemoryStore::new());
    let repo = SocialRepo::new(store.clone());
    let runs = RunsRepo::new(store);
    let hub = Arc::new(ConnectionHub::new());
    let dm = DmService::new(repo.clone(), hub.clone());

    let state = AppState {
        repo,
        runs,
        dm,
        hub: hub.clone(),
        verifier: TokenVerifier::new(SECRET, AUDIENCE),
        quotes: QuoteClient::new(),
    };

    (create_router(state), hub)
}

pub fn token_for(sub: &str, name: &str) -> String {
    mint_token(SECRET, AUDIENCE, sub, &format!("{sub}@example.com"), Some(name))
        .expect("mint test token")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

pub fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("build request")
}

pub fn authed_post(uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse json body")
}
