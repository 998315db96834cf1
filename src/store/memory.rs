//! In-Memory Table Backend
//!
//! A `BTreeMap` keyed by (partition key, sort key) behind a single `RwLock`.
//! The map's natural ordering gives sort-key order within a partition for
//! free, and every compound operation (conditional put, counter add) runs
//! under one write guard, which provides the atomicity the trait requires.
//!
//! This is the backend the server boots with and the one the test suite runs
//! against; a remote single-table backend slots in behind the same trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Item, ItemKey, PutOutcome, QueryPage, ScanFilter, StoreError, TableStore};

/// In-memory single-table store
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<BTreeMap<(String, String), serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_item(item: &Item) -> Result<(), StoreError> {
        if item.key.pk.is_empty() || item.key.sk.is_empty() {
            return Err(StoreError::Rejected("empty partition or sort key".into()));
        }
        if !item.body.is_object() {
            return Err(StoreError::Rejected("item body must be a JSON object".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn put_item(&self, item: Item) -> Result<(), StoreError> {
        Self::check_item(&item)?;
        let mut items = self.items.write().await;
        items.insert((item.key.pk, item.key.sk), item.body);
        Ok(())
    }

    async fn put_item_if_absent(&self, item: Item) -> Result<PutOutcome, StoreError> {
        Self::check_item(&item)?;
        let mut items = self.items.write().await;
        let key = (item.key.pk, item.key.sk);
        if items.contains_key(&key) {
            return Ok(PutOutcome::AlreadyExists);
        }
        items.insert(key, item.body);
        Ok(PutOutcome::Created)
    }

    async fn get_item(&self, pk: &str, sk: &str) -> Result<Option<Item>, StoreError> {
        let items = self.items.read().await;
        Ok(items.get(&(pk.to_string(), sk.to_string())).map(|body| {
            Item::new(ItemKey::new(pk, sk), body.clone())
        }))
    }

    async fn query(
        &self,
        pk: &str,
        sk_prefix: &str,
        limit: usize,
        scan_forward: bool,
        start_after: Option<ItemKey>,
    ) -> Result<QueryPage, StoreError> {
        let items = self.items.read().await;

        // Range over the partition, then keep sort keys under the prefix.
        let lower = (pk.to_string(), sk_prefix.to_string());
        let mut matched: Vec<Item> = items
            .range(lower..)
            .take_while(|((ipk, isk), _)| ipk == pk && isk.starts_with(sk_prefix))
            .map(|((ipk, isk), body)| Item::new(ItemKey::new(ipk.clone(), isk.clone()), body.clone()))
            .collect();

        if !scan_forward {
            matched.reverse();
        }

        let start = match start_after {
            Some(cursor) => match matched.iter().position(|it| it.key == cursor) {
                Some(pos) => pos + 1,
                // Unknown resume key: treat as the start of the partition.
                None => 0,
            },
            None => 0,
        };

        let remaining = matched.len().saturating_sub(start);
        let page: Vec<Item> = matched.into_iter().skip(start).take(limit).collect();
        let next = if remaining > limit {
            page.last().map(|it| it.key.clone())
        } else {
            None
        };

        Ok(QueryPage { items: page, next })
    }

    async fn update_counter(
        &self,
        pk: &str,
        sk: &str,
        attr: &str,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let mut items = self.items.write().await;
        let body = items
            .entry((pk.to_string(), sk.to_string()))
            .or_insert_with(|| serde_json::json!({}));
        let map = body
            .as_object_mut()
            .ok_or_else(|| StoreError::Rejected("counter target is not an object".into()))?;
        let current = match map.get(attr) {
            Some(v) => v
                .as_i64()
                .ok_or_else(|| StoreError::Rejected(format!("attribute '{attr}' is not numeric")))?,
            None => 0,
        };
        let updated = current + delta;
        map.insert(attr.to_string(), serde_json::json!(updated));
        Ok(updated)
    }

    async fn delete_item(&self, pk: &str, sk: &str) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        items.remove(&(pk.to_string(), sk.to_string()));
        Ok(())
    }

    async fn scan(&self, filter: ScanFilter, limit: usize) -> Result<Vec<Item>, StoreError> {
        let items = self.items.read().await;
        let mut out = Vec::new();
        for ((pk, sk), body) in items.iter() {
            let item = Item::new(ItemKey::new(pk.clone(), sk.clone()), body.clone());
            if filter(&item) {
                out.push(item);
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }
}
