//! In-memory [`ItemStore`] implementation for tests and non-persistent runs.
//!
//! Items live in a `BTreeMap` keyed by id behind `std::sync::RwLock`, so
//! iteration order is the id order the trait promises. A batch upsert holds
//! the write lock for its whole duration and is therefore atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{CatalogItem, CountRow, ItemQuery, SyncRecord};

use super::{ranked_counts, ItemStore};

/// In-memory store for testing and standalone clustering.
pub struct InMemoryStore {
    items: RwLock<BTreeMap<String, CatalogItem>>,
    syncs: RwLock<Vec<SyncRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            syncs: RwLock::new(Vec::new()),
        }
    }

    fn items_read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, CatalogItem>>> {
        self.items.read().map_err(|_| anyhow!("item map lock poisoned"))
    }

    fn items_write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, CatalogItem>>> {
        self.items.write().map_err(|_| anyhow!("item map lock poisoned"))
    }

    fn syncs_read(&self) -> Result<RwLockReadGuard<'_, Vec<SyncRecord>>> {
        self.syncs.read().map_err(|_| anyhow!("sync ledger lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn upsert_ignore(&self, items: &[CatalogItem]) -> Result<u64> {
        let mut stored = self.items_write()?;
        let mut inserted = 0u64;
        for item in items {
            if !stored.contains_key(&item.id) {
                stored.insert(item.id.clone(), item.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn query_items(&self, query: &ItemQuery) -> Result<Vec<CatalogItem>> {
        let stored = self.items_read()?;
        Ok(stored
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect())
    }

    async fn record_sync(&self, record: &SyncRecord) -> Result<()> {
        self.syncs
            .write()
            .map_err(|_| anyhow!("sync ledger lock poisoned"))?
            .push(record.clone());
        Ok(())
    }

    async fn total_items(&self) -> Result<i64> {
        Ok(self.items_read()?.len() as i64)
    }

    async fn items_by_host(&self) -> Result<Vec<CountRow>> {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for item in self.items_read()?.values() {
            *counts.entry(item.host.clone()).or_default() += 1;
        }
        Ok(ranked_counts(counts, None))
    }

    async fn items_by_collection(&self, limit: i64) -> Result<Vec<CountRow>> {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for item in self.items_read()?.values() {
            *counts.entry(item.collection_name().to_string()).or_default() += 1;
        }
        Ok(ranked_counts(counts, Some(limit)))
    }

    async fn items_by_month(&self, limit: i64) -> Result<Vec<CountRow>> {
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for item in self.items_read()?.values() {
            if let Some(dt) = item.datetime {
                *counts.entry(dt.format("%Y-%m").to_string()).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .rev()
            .take(limit.max(0) as usize)
            .map(|(key, count)| CountRow { key, count })
            .collect())
    }

    async fn recent_syncs(&self, limit: i64) -> Result<Vec<SyncRecord>> {
        let syncs = self.syncs_read()?;
        let mut recent: Vec<SyncRecord> = syncs.iter().rev().cloned().collect();
        // Stable sort keeps insertion order (newest first) among equal timestamps.
        recent.sort_by(|a, b| b.synced_at.cmp(&a.synced_at));
        recent.truncate(limit.max(0) as usize);
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn item(id: &str, host: &str, constellation: &str, datetime: &str) -> CatalogItem {
        let feature = json!({
            "id": id,
            "geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
            "properties": { "constellation": constellation, "datetime": datetime },
        });
        CatalogItem::from_stac(&feature, host, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_ignore_is_idempotent() {
        let store = InMemoryStore::new();
        let batch = vec![
            item("a", "oneatlas", "PHR", "2025-05-01T00:00:00Z"),
            item("b", "oneatlas", "PHR", "2025-05-02T00:00:00Z"),
        ];
        assert_eq!(store.upsert_ignore(&batch).await.unwrap(), 2);
        assert_eq!(store.upsert_ignore(&batch).await.unwrap(), 0);
        assert_eq!(store.total_items().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_existing_rows_never_overwritten() {
        let store = InMemoryStore::new();
        store
            .upsert_ignore(&[item("a", "oneatlas", "PHR", "2025-05-01T00:00:00Z")])
            .await
            .unwrap();
        store
            .upsert_ignore(&[item("a", "capella", "CAP", "2025-05-09T00:00:00Z")])
            .await
            .unwrap();

        let items = store.query_items(&ItemQuery::default()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].host, "oneatlas");
    }

    #[tokio::test]
    async fn test_aggregates() {
        let store = InMemoryStore::new();
        store
            .upsert_ignore(&[
                item("a", "oneatlas", "PHR", "2025-04-01T00:00:00Z"),
                item("b", "oneatlas", "PNEO", "2025-05-02T00:00:00Z"),
                item("c", "oneatlas", "PNEO", "2025-05-03T00:00:00Z"),
                item("d", "capella", "CAP", "2025-05-04T00:00:00Z"),
            ])
            .await
            .unwrap();

        let hosts = store.items_by_host().await.unwrap();
        assert_eq!(hosts[0], CountRow { key: "oneatlas".into(), count: 3 });

        let collections = store.items_by_collection(1).await.unwrap();
        assert_eq!(collections, vec![CountRow { key: "PNEO".into(), count: 2 }]);

        let months = store.items_by_month(12).await.unwrap();
        assert_eq!(months[0], CountRow { key: "2025-05".into(), count: 3 });
        assert_eq!(months[1], CountRow { key: "2025-04".into(), count: 1 });
    }
}
