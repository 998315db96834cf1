//! Run Records and Rate Buckets
//!
//! Runs are stored as `RUN#<ts>#<id>` under the user partition, so recent
//! runs and today's runs are both prefix queries. Rate buckets are
//! counter-only items keyed by the hour; the bucket key embeds the hour, so
//! stale buckets are simply never read again (expiry is the backing
//! table's concern).

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::Error;
use crate::social::keys;
use crate::social::records::{Record, Run};
use crate::store::{Item, ItemKey, StoreError, TableStore};

/// Repository for assistant run records
#[derive(Clone)]
pub struct RunsRepo {
    store: Arc<dyn TableStore>,
}

impl RunsRepo {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Record a queued run under the user's partition
    pub async fn create_run(
        &self,
        sub: &str,
        run_type: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<Run, Error> {
        let run_id = Uuid::new_v4().to_string();
        let ts = keys::now_iso();
        let run = Run {
            run_id: run_id.clone(),
            run_type: run_type.to_string(),
            status: "queued".to_string(),
            created_at: ts.clone(),
            payload,
        };

        let body = serde_json::to_value(Record::Run(run.clone()))
            .map_err(|e| Error::Store(StoreError::Rejected(format!("encode failed: {e}"))))?;
        self.store
            .put_item(Item::new(
                ItemKey::new(keys::user_pk(sub), keys::run_sk(&ts, &run_id)),
                body,
            ))
            .await?;

        Ok(run)
    }

    /// Most recent runs, newest first
    pub async fn list_recent_runs(&self, sub: &str, limit: usize) -> Result<Vec<Run>, Error> {
        self.query_runs(sub, "RUN#", limit).await
    }

    /// Runs created today (UTC), newest first
    pub async fn list_today_runs(&self, sub: &str, limit: usize) -> Result<Vec<Run>, Error> {
        let prefix = Utc::now().format("RUN#%Y-%m-%d").to_string();
        self.query_runs(sub, &prefix, limit).await
    }

    /// Atomically bump the caller's hourly rate bucket, returning the count
    pub async fn bump_rate(&self, sub: &str, key: &str) -> Result<i64, Error> {
        let bucket = Utc::now().format("%Y%m%dT%H").to_string();
        let count = self
            .store
            .update_counter(&keys::user_pk(sub), &keys::rate_sk(key, &bucket), "count", 1)
            .await?;
        Ok(count)
    }

    /// Usage summary for today
    pub async fn get_usage_today(&self, sub: &str) -> Result<serde_json::Value, Error> {
        let runs = self.list_today_runs(sub, 100).await?;
        Ok(serde_json::json!({ "runs_today": runs.len() }))
    }

    async fn query_runs(&self, sub: &str, prefix: &str, limit: usize) -> Result<Vec<Run>, Error> {
        let page = self
            .store
            .query(&keys::user_pk(sub), prefix, limit, false, None)
            .await?;

        let mut out = Vec::with_capacity(page.items.len());
        for item in &page.items {
            match serde_json::from_value(item.body.clone()) {
                Ok(Record::Run(run)) => out.push(run),
                Ok(other) => {
                    return Err(Error::Store(StoreError::Rejected(format!(
                        "unexpected '{}' record at {}/{}",
                        other.kind(),
                        item.key.pk,
                        item.key.sk
                    ))))
                }
                Err(e) => {
                    return Err(Error::Store(StoreError::Rejected(format!(
                        "corrupt item {}/{}: {e}",
                        item.key.pk, item.key.sk
                    ))))
                }
            }
        }
        Ok(out)
    }
}
