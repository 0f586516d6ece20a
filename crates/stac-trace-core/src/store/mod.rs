//! Storage abstraction for catalog items and the sync ledger.
//!
//! The [`ItemStore`] trait is the only way the sync pipeline, the clusterer
//! and the status report touch persisted state, so backends stay pluggable
//! (SQLite in the app crate, [`memory::InMemoryStore`] for tests and
//! standalone runs).
//!
//! Items are append-only: once an `id` is stored it is never overwritten or
//! deleted, which makes re-fetching the same catalog window harmless.

pub mod memory;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CatalogItem, CountRow, ItemQuery, SyncRecord};

/// Abstract item repository.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_ignore`](ItemStore::upsert_ignore) | Insert items whose id is not yet stored |
/// | [`query_items`](ItemStore::query_items) | Items matching an [`ItemQuery`], ordered by id |
/// | [`record_sync`](ItemStore::record_sync) | Append a [`SyncRecord`] |
/// | [`total_items`](ItemStore::total_items) | Row count |
/// | [`items_by_host`](ItemStore::items_by_host) | Counts per host |
/// | [`items_by_collection`](ItemStore::items_by_collection) | Counts per constellation |
/// | [`items_by_month`](ItemStore::items_by_month) | Counts per acquisition month, newest first |
/// | [`recent_syncs`](ItemStore::recent_syncs) | Latest sync ledger rows |
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert every item whose `id` is not already present.
    ///
    /// Existing rows are left untouched. The whole batch is applied
    /// atomically. Returns the number of rows actually inserted.
    async fn upsert_ignore(&self, items: &[CatalogItem]) -> Result<u64>;

    async fn query_items(&self, query: &ItemQuery) -> Result<Vec<CatalogItem>>;

    async fn record_sync(&self, record: &SyncRecord) -> Result<()>;

    async fn total_items(&self) -> Result<i64>;

    async fn items_by_host(&self) -> Result<Vec<CountRow>>;

    /// Counts per constellation, largest first. Items without a
    /// constellation are grouped under `unknown`.
    async fn items_by_collection(&self, limit: i64) -> Result<Vec<CountRow>>;

    /// Counts per `YYYY-MM` acquisition month, most recent month first.
    async fn items_by_month(&self, limit: i64) -> Result<Vec<CountRow>>;

    /// Most recent ledger entries, newest first.
    async fn recent_syncs(&self, limit: i64) -> Result<Vec<SyncRecord>>;
}

/// Sort counts largest first with the key as tie-breaker.
pub(crate) fn ranked_counts(counts: HashMap<String, i64>, limit: Option<i64>) -> Vec<CountRow> {
    let mut rows: Vec<CountRow> = counts
        .into_iter()
        .map(|(key, count)| CountRow { key, count })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    if let Some(limit) = limit {
        rows.truncate(limit.max(0) as usize);
    }
    rows
}
