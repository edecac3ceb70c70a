//! Postgres-backed implementation of the calculator store.
//!
//! # Data model
//! Two tables: `pack_sizes` is the authoritative set of configured sizes
//! (unique `size` column), `orders` is an append-only journal of completed
//! calculations with the chosen multiset stored as JSONB. Migrations run at
//! startup via `sqlx::migrate!` so handlers can assume the schema exists.
//!
//! # Concurrency and pooling
//! Safe to share across request handlers; `sqlx` leases connections from the
//! pool. Pool limits and the acquire timeout are explicit because hanging
//! indefinitely on an unhealthy database is worse than failing fast.
use super::{OrderJournal, PackStore, StoreError, StoreResult};
use crate::config::PostgresConfig;
use crate::model::{NewOrder, OrderRecord, PackSize};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

pub struct PostgresStore {
    pool: PgPool,
}

/// Row shape for `pack_sizes`. DB-facing structs stay separate from the
/// domain model so column types and names are isolated here.
#[derive(Debug, Clone, FromRow)]
struct DbPackSize {
    id: i64,
    size: i64,
    created_at: DateTime<Utc>,
}

/// Row shape for `orders`; `packs` is the JSONB multiset.
#[derive(Debug, Clone, FromRow)]
struct DbOrder {
    id: i64,
    amount: i64,
    total_items: i64,
    total_packs: i64,
    packs: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl DbPackSize {
    fn into_model(self) -> PackSize {
        PackSize {
            id: self.id,
            size: self.size as u64,
            created_at: self.created_at,
        }
    }
}

impl DbOrder {
    fn into_model(self) -> StoreResult<OrderRecord> {
        let packs: BTreeMap<u64, u64> = serde_json::from_value(self.packs)
            .map_err(|e| StoreError::Unexpected(anyhow!("malformed pack multiset: {e}")))?;
        Ok(OrderRecord {
            id: self.id,
            amount: self.amount as u64,
            total_items: self.total_items as u64,
            total_packs: self.total_packs as u64,
            packs,
            created_at: self.created_at,
        })
    }
}

impl PostgresStore {
    /// Connect to Postgres and run migrations before serving.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        let connect_options =
            PgConnectOptions::from_str(&pg.url).map_err(|e| StoreError::Unexpected(e.into()))?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::Unexpected(e.into()))?;

        // Fail startup on migration errors rather than serving a partial
        // schema.
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unexpected(e.into()))?;

        Ok(Self { pool })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err.as_database_error().and_then(|db| db.code()),
        Some(code) if code == "23505"
    )
}

#[async_trait]
impl PackStore for PostgresStore {
    async fn list_pack_sizes(&self) -> StoreResult<Vec<PackSize>> {
        let rows = sqlx::query_as::<_, DbPackSize>(
            "SELECT id, size, created_at FROM pack_sizes ORDER BY size ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Unexpected(e.into()))?;
        Ok(rows.into_iter().map(DbPackSize::into_model).collect())
    }

    async fn pack_size_values(&self) -> StoreResult<Vec<u64>> {
        let sizes =
            sqlx::query_scalar::<_, i64>("SELECT size FROM pack_sizes ORDER BY size ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Unexpected(e.into()))?;
        Ok(sizes.into_iter().map(|s| s as u64).collect())
    }

    async fn add_pack_size(&self, size: u64) -> StoreResult<PackSize> {
        let inserted = sqlx::query_as::<_, DbPackSize>(
            "INSERT INTO pack_sizes (size) VALUES ($1) RETURNING id, size, created_at",
        )
        .bind(size as i64)
        .fetch_one(&self.pool)
        .await;
        match inserted {
            Ok(row) => Ok(row.into_model()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict("pack size exists".into()))
            }
            Err(err) => Err(StoreError::Unexpected(err.into())),
        }
    }

    async fn delete_pack_size(&self, size: u64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM pack_sizes WHERE size = $1")
            .bind(size as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unexpected(e.into()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("pack size".into()));
        }
        Ok(())
    }

    async fn pack_size_exists(&self, size: u64) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM pack_sizes WHERE size = $1)")
            .bind(size as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Unexpected(e.into()))
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unexpected(e.into()))?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl OrderJournal for PostgresStore {
    async fn append_order(&self, order: NewOrder) -> StoreResult<OrderRecord> {
        let packs = serde_json::to_value(&order.packs)
            .map_err(|e| StoreError::Unexpected(anyhow!("serialize pack multiset: {e}")))?;
        let row = sqlx::query_as::<_, DbOrder>(
            r#"INSERT INTO orders (amount, total_items, total_packs, packs)
               VALUES ($1, $2, $3, $4)
               RETURNING id, amount, total_items, total_packs, packs, created_at"#,
        )
        .bind(order.amount as i64)
        .bind(order.total_items as i64)
        .bind(order.total_packs as i64)
        .bind(packs)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Unexpected(e.into()))?;
        row.into_model()
    }

    async fn recent_orders(&self, limit: u32) -> StoreResult<Vec<OrderRecord>> {
        let rows = sqlx::query_as::<_, DbOrder>(
            r#"SELECT id, amount, total_items, total_packs, packs, created_at
               FROM orders ORDER BY created_at DESC, id DESC LIMIT $1"#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Unexpected(e.into()))?;
        rows.into_iter().map(DbOrder::into_model).collect()
    }
}
