// Pack calculation HTTP service.
// ------------------------------
// Exposes a JSON/HTTP API (axum) that answers one question: given an order
// amount and the configured pack sizes, which whole packs ship? The optimal
// combination minimizes total items first, then pack count.
//
// Storage model:
// - Pluggable store: Postgres (default, via sqlx with startup migrations) or
//   in-memory when STORE_BACKEND=memory. The Postgres journal keeps an
//   append-only history of completed calculations.
// - Results are cached in a bounded in-process LRU keyed by
//   (amount, size set); any pack-size mutation wipes the cache.
use anyhow::Context;
use packwise_api::app::{AppState, build_router};
use packwise_api::config::{AppConfig, StorageBackend};
use packwise_api::coordinator::RequestCoordinator;
use packwise_api::middleware::RateLimiter;
use packwise_api::observability;
use packwise_api::store::memory::InMemoryStore;
use packwise_api::store::postgres::PostgresStore;
use packwise_api::store::{CalculatorStore, PackStore as _, seed_default_pack_sizes};
use packwise_cache::MemoryCache;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let metrics_handle = observability::init_observability("packwise-api");

    let config = AppConfig::from_env_or_yaml().context("load configuration")?;
    let store: Arc<dyn CalculatorStore + Send + Sync> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg).await?)
        }
    };
    seed_default_pack_sizes(store.as_ref()).await?;
    tracing::info!(
        backend = store.backend_name(),
        durable = store.is_durable(),
        "store ready"
    );

    let cache = Arc::new(MemoryCache::new(config.cache_size));
    tracing::info!(capacity = config.cache_size, "result cache ready");
    let coordinator = Arc::new(RequestCoordinator::new(
        Arc::clone(&store),
        Arc::clone(&cache) as _,
        config.cache_ttl,
    ));
    let rate_limiter = RateLimiter::new(config.rate_limit_refill, config.rate_limit_burst);
    rate_limiter.spawn_sweeper();
    if config.api_key.is_some() {
        tracing::info!("API key required for pack size mutations");
    }

    let state = AppState {
        store,
        cache,
        coordinator,
        rate_limiter,
        api_key: config.api_key.clone(),
    };

    tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, "pack calculation service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
