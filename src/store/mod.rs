//! Single-Table Store Client
//!
//! This module wraps a single-table key/value store. Items are addressed by a
//! (partition key, sort key) pair; both are opaque strings composed of
//! `TYPE#value` segments. The store owns no domain semantics - it is a pure
//! accessor, and the repositories above it are the only writers on the
//! backend's behalf.
//!
//! # Guarantees
//!
//! - `put_item_if_absent` is atomic: under concurrent callers exactly one
//!   succeeds per key, and the outcome is reported as an explicit
//!   [`PutOutcome`] rather than an error.
//! - `update_counter` is an atomic add with no read-modify-write race.
//! - `query` returns items in sort-key order (ascending or descending) and
//!   paginates via the last returned key.
//!
//! # Failure Modes
//!
//! Every operation can fail with [`StoreError::Unavailable`] (transient, the
//! caller may retry) or [`StoreError::Rejected`] (malformed request, not
//! retried).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// Composite key addressing one item in the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemKey {
    /// Partition key, groups related items
    pub pk: String,
    /// Sort key, orders items within the partition
    pub sk: String,
}

impl ItemKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

/// One stored item: its key plus a schema-less JSON object body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub key: ItemKey,
    pub body: serde_json::Value,
}

impl Item {
    pub fn new(key: ItemKey, body: serde_json::Value) -> Self {
        Self { key, body }
    }
}

/// Outcome of a conditional create
///
/// `put_item_if_absent` reports conflicts as a value, so callers branch on
/// the result instead of catching a conflict error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The item did not exist and was written
    Created,
    /// An item with this key already exists; nothing was written
    AlreadyExists,
}

/// One page of query results
#[derive(Debug, Clone)]
pub struct QueryPage {
    /// Items in sort-key order per the query's direction
    pub items: Vec<Item>,
    /// Key of the last returned item when more rows remain, else `None`
    pub next: Option<ItemKey>,
}

/// Store failure taxonomy
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Transient backend failure; the caller may retry
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Malformed request or item; retrying will not help
    #[error("store rejected request: {0}")]
    Rejected(String),
}

/// Predicate applied to items during a scan
pub type ScanFilter = Box<dyn Fn(&Item) -> bool + Send + Sync>;

/// Operations every table backend must provide
///
/// Implementations are held as `Arc<dyn TableStore>` so repositories stay
/// independent of the concrete backend.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Write an item unconditionally, replacing any existing one
    async fn put_item(&self, item: Item) -> Result<(), StoreError>;

    /// Write an item only if no item exists under its key
    async fn put_item_if_absent(&self, item: Item) -> Result<PutOutcome, StoreError>;

    /// Fetch a single item by key
    async fn get_item(&self, pk: &str, sk: &str) -> Result<Option<Item>, StoreError>;

    /// Read items under one partition whose sort key starts with `sk_prefix`
    ///
    /// `scan_forward` selects ascending (`true`) or descending sort-key
    /// order. `start_after` is an exclusive resume point in that order.
    async fn query(
        &self,
        pk: &str,
        sk_prefix: &str,
        limit: usize,
        scan_forward: bool,
        start_after: Option<ItemKey>,
    ) -> Result<QueryPage, StoreError>;

    /// Atomically add `delta` to a numeric attribute, returning the new value
    ///
    /// Creates the item or the attribute when absent, matching single-table
    /// ADD semantics.
    async fn update_counter(
        &self,
        pk: &str,
        sk: &str,
        attr: &str,
        delta: i64,
    ) -> Result<i64, StoreError>;

    /// Delete an item by key; deleting a missing item is not an error
    async fn delete_item(&self, pk: &str, sk: &str) -> Result<(), StoreError>;

    /// Walk the whole table, returning up to `limit` items matching `filter`
    ///
    /// Table scans are O(table size); only small-scale lookups (profile
    /// search) use this.
    async fn scan(&self, filter: ScanFilter, limit: usize) -> Result<Vec<Item>, StoreError>;
}
