//! Persistence layer for pack sizes and the order journal.
//!
//! # Purpose
//! Defines the store traits the coordinator and handlers depend on, with an
//! in-memory backend for development and tests and a Postgres backend for
//! durable deployments.
use crate::model::{NewOrder, OrderRecord, PackSize};
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod postgres;

/// Pack sizes seeded into an empty store on startup.
pub const DEFAULT_PACK_SIZES: [u64; 5] = [250, 500, 1000, 2000, 5000];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent set of distinct positive pack sizes.
#[async_trait]
pub trait PackStore: Send + Sync {
    /// All configured sizes with metadata, ascending by size.
    async fn list_pack_sizes(&self) -> StoreResult<Vec<PackSize>>;
    /// Just the size values, ascending. This is the solver's configuration.
    async fn pack_size_values(&self) -> StoreResult<Vec<u64>>;
    /// Add a size; `Conflict` when it already exists.
    async fn add_pack_size(&self, size: u64) -> StoreResult<PackSize>;
    /// Remove a size; `NotFound` when absent.
    async fn delete_pack_size(&self, size: u64) -> StoreResult<()>;
    async fn pack_size_exists(&self, size: u64) -> StoreResult<bool>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

/// Append-only log of completed calculations. Appends are best-effort from
/// the caller's perspective; reads return most-recent-first.
#[async_trait]
pub trait OrderJournal: Send + Sync {
    async fn append_order(&self, order: NewOrder) -> StoreResult<OrderRecord>;
    async fn recent_orders(&self, limit: u32) -> StoreResult<Vec<OrderRecord>>;
}

/// Combined store surface the service wires up once and shares.
pub trait CalculatorStore: PackStore + OrderJournal {}

impl<T: PackStore + OrderJournal> CalculatorStore for T {}

/// Seed the default pack sizes when the store holds none.
///
/// Keeps a fresh deployment calculable without an admin call; an already
/// populated store is left untouched.
pub async fn seed_default_pack_sizes<S: PackStore + ?Sized>(store: &S) -> StoreResult<()> {
    if !store.list_pack_sizes().await?.is_empty() {
        return Ok(());
    }
    for size in DEFAULT_PACK_SIZES {
        match store.add_pack_size(size).await {
            Ok(_) | Err(StoreError::Conflict(_)) => {}
            Err(err) => return Err(err),
        }
    }
    tracing::info!(sizes = ?DEFAULT_PACK_SIZES, "seeded default pack sizes");
    Ok(())
}
