//! Request coordination for pack calculations.
//!
//! # Purpose
//! Glue between the HTTP layer and the core: validates the requested amount,
//! loads the current pack configuration, consults the result cache, runs the
//! solver on a miss, writes the result through, and hands the completed
//! calculation to the order journal without blocking the response.
//!
//! # State
//! Stateless per request; the long-lived pieces (store, cache) are shared
//! collaborators. Cache invalidation on configuration change is owned by the
//! admin handlers, which clear the cache before their response leaves the
//! process.
use crate::model::NewOrder;
use crate::store::{CalculatorStore, OrderJournal as _, PackStore as _, StoreError};
use packwise_cache::{ResultCache, cache_key};
use packwise_solver::{SolveError, pack_count, solve};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on accepted order amounts; bounds solver memory.
pub const MAX_AMOUNT: u64 = 10_000_000;

/// Default time-to-live for cached calculations.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Cached payload: the multiset and item total. The pack count is cheap to
/// rebuild from the multiset, so it is not stored twice.
#[derive(Debug, Clone)]
pub struct CachedSolution {
    pub packs: BTreeMap<u64, u64>,
    pub total_items: u64,
}

/// A completed calculation as returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Calculation {
    pub amount: u64,
    pub total_items: u64,
    pub total_packs: u64,
    pub packs: BTreeMap<u64, u64>,
}

#[derive(Debug, Error)]
pub enum CalcError {
    #[error("amount must be at least 1")]
    InvalidAmount,
    #[error("amount too large, maximum allowed: {MAX_AMOUNT}")]
    AmountTooLarge,
    #[error("no pack sizes configured")]
    NoConfig,
    #[error(transparent)]
    Store(StoreError),
    #[error("calculation failed")]
    Internal,
}

pub struct RequestCoordinator {
    store: Arc<dyn CalculatorStore + Send + Sync>,
    cache: Arc<dyn ResultCache<CachedSolution>>,
    cache_ttl: Duration,
}

impl RequestCoordinator {
    pub fn new(
        store: Arc<dyn CalculatorStore + Send + Sync>,
        cache: Arc<dyn ResultCache<CachedSolution>>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    /// Calculate the optimal pack combination for `amount`.
    pub async fn calculate(&self, amount: i64) -> Result<Calculation, CalcError> {
        if amount < 1 {
            return Err(CalcError::InvalidAmount);
        }
        let amount = amount as u64;
        if amount > MAX_AMOUNT {
            return Err(CalcError::AmountTooLarge);
        }

        let sizes = self
            .store
            .pack_size_values()
            .await
            .map_err(CalcError::Store)?;
        if sizes.is_empty() {
            return Err(CalcError::NoConfig);
        }

        let key = cache_key(amount, &sizes);
        if let Some(cached) = self.cache.get(&key) {
            metrics::counter!("packwise_calculations_total", "cache" => "hit").increment(1);
            return Ok(Calculation {
                amount,
                total_items: cached.total_items,
                total_packs: pack_count(&cached.packs),
                packs: cached.packs,
            });
        }

        let solution = solve(amount, &sizes).map_err(|err| match err {
            SolveError::InvalidAmount => CalcError::InvalidAmount,
            SolveError::NoConfig => CalcError::NoConfig,
            SolveError::NoSolution => {
                // Unreachable for validated input over positive sizes.
                tracing::error!(amount, ?sizes, "solver found no combination");
                CalcError::Internal
            }
        })?;
        metrics::counter!("packwise_calculations_total", "cache" => "miss").increment(1);

        self.cache.set(
            key,
            CachedSolution {
                packs: solution.packs.clone(),
                total_items: solution.total_items,
            },
            self.cache_ttl,
        );

        let calculation = Calculation {
            amount,
            total_items: solution.total_items,
            total_packs: solution.total_packs,
            packs: solution.packs,
        };
        self.journal(&calculation);
        Ok(calculation)
    }

    /// Fire-and-forget journal append. Failure is logged and never surfaces
    /// to the caller; the calculation stands on its own.
    fn journal(&self, calculation: &Calculation) {
        let store = Arc::clone(&self.store);
        let order = NewOrder {
            amount: calculation.amount,
            total_items: calculation.total_items,
            total_packs: calculation.total_packs,
            packs: calculation.packs.clone(),
        };
        tokio::spawn(async move {
            if let Err(err) = store.append_order(order).await {
                tracing::warn!(error = ?err, "failed to journal calculation");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use crate::store::{OrderJournal, PackStore};
    use packwise_cache::MemoryCache;
    use packwise_cache::ResultCache as _;

    async fn coordinator_with_sizes(sizes: &[u64]) -> RequestCoordinator {
        let store = Arc::new(InMemoryStore::new());
        for &size in sizes {
            store.add_pack_size(size).await.expect("seed");
        }
        RequestCoordinator::new(
            store,
            Arc::new(MemoryCache::new(16)),
            DEFAULT_CACHE_TTL,
        )
    }

    #[tokio::test]
    async fn validates_amount_bounds() {
        let coordinator = coordinator_with_sizes(&[250]).await;
        assert!(matches!(
            coordinator.calculate(0).await,
            Err(CalcError::InvalidAmount)
        ));
        assert!(matches!(
            coordinator.calculate(-5).await,
            Err(CalcError::InvalidAmount)
        ));
        assert!(matches!(
            coordinator.calculate(MAX_AMOUNT as i64 + 1).await,
            Err(CalcError::AmountTooLarge)
        ));
        coordinator
            .calculate(MAX_AMOUNT as i64)
            .await
            .expect("maximum amount is accepted");
    }

    #[tokio::test]
    async fn rejects_empty_configuration() {
        let coordinator = coordinator_with_sizes(&[]).await;
        assert!(matches!(
            coordinator.calculate(10).await,
            Err(CalcError::NoConfig)
        ));
    }

    #[tokio::test]
    async fn repeated_calculations_hit_the_cache() {
        let store = Arc::new(InMemoryStore::new());
        store.add_pack_size(250).await.expect("seed");
        store.add_pack_size(500).await.expect("seed");
        let cache = Arc::new(MemoryCache::new(16));
        let coordinator =
            RequestCoordinator::new(store, Arc::clone(&cache) as _, DEFAULT_CACHE_TTL);

        let first = coordinator.calculate(501).await.expect("first");
        let second = coordinator.calculate(501).await.expect("second");
        assert_eq!(first, second);
        assert_eq!(first.total_items, 750);
        assert_eq!(first.total_packs, 2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn configuration_change_invalidates_cached_results() {
        let store = Arc::new(InMemoryStore::new());
        store.add_pack_size(250).await.expect("seed");
        let cache = Arc::new(MemoryCache::new(16));
        let coordinator = RequestCoordinator::new(
            Arc::clone(&store) as _,
            Arc::clone(&cache) as _,
            DEFAULT_CACHE_TTL,
        );

        coordinator.calculate(100).await.expect("warm");
        assert_eq!(cache.stats().size, 1);

        // Admin surface clears the cache alongside the store mutation.
        store.add_pack_size(100).await.expect("mutate");
        cache.clear();

        let recalculated = coordinator.calculate(100).await.expect("recalculate");
        assert_eq!(recalculated.total_items, 100);
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn calculations_reach_the_journal() {
        let store = Arc::new(InMemoryStore::new());
        store.add_pack_size(250).await.expect("seed");
        let coordinator = RequestCoordinator::new(
            Arc::clone(&store) as _,
            Arc::new(MemoryCache::new(16)),
            DEFAULT_CACHE_TTL,
        );

        coordinator.calculate(600).await.expect("calculate");

        // The append is spawned; poll briefly instead of racing it.
        let mut recent = Vec::new();
        for _ in 0..100 {
            recent = store.recent_orders(10).await.expect("recent");
            if !recent.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].amount, 600);
        assert_eq!(recent[0].total_items, 750);
        assert_eq!(recent[0].total_packs, 3);
    }
}
