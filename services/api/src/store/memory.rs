//! In-memory implementation of the calculator store.
//!
//! # Purpose
//! Implements [`PackStore`] and [`OrderJournal`] entirely in memory using
//! maps guarded by `tokio::sync::RwLock`. It exists for local development
//! and tests (no external dependencies) and as the fallback when Postgres is
//! not configured.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - Single-process consistency: write locks for mutations, read locks for
//!   reads; id assignment is atomic.
use super::{OrderJournal, PackStore, StoreError, StoreResult};
use crate::model::{NewOrder, OrderRecord, PackSize};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

pub struct InMemoryStore {
    /// Configured sizes keyed by value; BTreeMap keeps listing ascending.
    packs: RwLock<BTreeMap<u64, PackSize>>,
    /// Journal in append order; reads walk it backwards.
    orders: RwLock<Vec<OrderRecord>>,
    next_pack_id: AtomicI64,
    next_order_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            packs: RwLock::new(BTreeMap::new()),
            orders: RwLock::new(Vec::new()),
            next_pack_id: AtomicI64::new(1),
            next_order_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackStore for InMemoryStore {
    async fn list_pack_sizes(&self) -> StoreResult<Vec<PackSize>> {
        Ok(self.packs.read().await.values().cloned().collect())
    }

    async fn pack_size_values(&self) -> StoreResult<Vec<u64>> {
        Ok(self.packs.read().await.keys().copied().collect())
    }

    async fn add_pack_size(&self, size: u64) -> StoreResult<PackSize> {
        let mut packs = self.packs.write().await;
        if packs.contains_key(&size) {
            return Err(StoreError::Conflict("pack size exists".into()));
        }
        let record = PackSize {
            id: self.next_pack_id.fetch_add(1, Ordering::Relaxed),
            size,
            created_at: Utc::now(),
        };
        packs.insert(size, record.clone());
        Ok(record)
    }

    async fn delete_pack_size(&self, size: u64) -> StoreResult<()> {
        let mut packs = self.packs.write().await;
        if packs.remove(&size).is_none() {
            return Err(StoreError::NotFound("pack size".into()));
        }
        Ok(())
    }

    async fn pack_size_exists(&self, size: u64) -> StoreResult<bool> {
        Ok(self.packs.read().await.contains_key(&size))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl OrderJournal for InMemoryStore {
    async fn append_order(&self, order: NewOrder) -> StoreResult<OrderRecord> {
        let record = OrderRecord {
            id: self.next_order_id.fetch_add(1, Ordering::Relaxed),
            amount: order.amount,
            total_items: order.total_items,
            total_packs: order.total_packs,
            packs: order.packs,
            created_at: Utc::now(),
        };
        self.orders.write().await.push(record.clone());
        Ok(record)
    }

    async fn recent_orders(&self, limit: u32) -> StoreResult<Vec<OrderRecord>> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn pack_sizes_are_unique_and_listed_ascending() {
        let store = InMemoryStore::new();
        store.add_pack_size(500).await.expect("add");
        store.add_pack_size(250).await.expect("add");
        assert!(matches!(
            store.add_pack_size(500).await,
            Err(StoreError::Conflict(_))
        ));

        let values = store.pack_size_values().await.expect("values");
        assert_eq!(values, vec![250, 500]);
        let listed = store.list_pack_sizes().await.expect("list");
        assert_eq!(listed[0].size, 250);
        assert!(listed[0].id != listed[1].id);
    }

    #[tokio::test]
    async fn delete_reports_missing_sizes() {
        let store = InMemoryStore::new();
        store.add_pack_size(250).await.expect("add");
        store.delete_pack_size(250).await.expect("delete");
        assert!(matches!(
            store.delete_pack_size(250).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.pack_size_exists(250).await.expect("exists"));
    }

    #[tokio::test]
    async fn journal_reads_most_recent_first() {
        let store = InMemoryStore::new();
        for amount in [1u64, 2, 3] {
            store
                .append_order(NewOrder {
                    amount,
                    total_items: amount,
                    total_packs: 1,
                    packs: BTreeMap::from([(amount, 1)]),
                })
                .await
                .expect("append");
        }
        let recent = store.recent_orders(2).await.expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].amount, 3);
        assert_eq!(recent[1].amount, 2);
    }
}
