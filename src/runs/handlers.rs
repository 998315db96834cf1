//! Runs HTTP Handlers

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::Error;

use super::RunsRepo;

#[derive(Debug, Deserialize)]
pub struct RunIn {
    #[serde(rename = "type")]
    pub run_type: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RunListQuery {
    #[serde(default = "default_runs_limit")]
    pub limit: usize,
}

fn default_runs_limit() -> usize {
    10
}

/// Record a new run and bump the caller's hourly rate bucket
pub async fn create_run(
    State(repo): State<RunsRepo>,
    AuthUser(claims): AuthUser,
    Json(data): Json<RunIn>,
) -> Result<Json<serde_json::Value>, Error> {
    let run = repo
        .create_run(&claims.sub, &data.run_type, data.payload)
        .await?;
    let hourly = repo.bump_rate(&claims.sub, "runs").await?;
    tracing::debug!(sub = %claims.sub, hourly, "run recorded");
    Ok(Json(serde_json::json!({ "ok": true, "run": run })))
}

/// Most recent runs for the caller
pub async fn list_runs(
    State(repo): State<RunsRepo>,
    AuthUser(claims): AuthUser,
    Query(query): Query<RunListQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let items = repo.list_recent_runs(&claims.sub, query.limit).await?;
    Ok(Json(serde_json::json!({ "items": items })))
}

/// Today's usage summary for the caller
pub async fn usage_today(
    State(repo): State<RunsRepo>,
    AuthUser(claims): AuthUser,
) -> Result<Json<serde_json::Value>, Error> {
    let usage = repo.get_usage_today(&claims.sub).await?;
    Ok(Json(usage))
}
