//! Health endpoint.
use crate::api::types::{CacheStatsResponse, HealthResponse};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;
use packwise_cache::ResultCache;

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service health with cache counters", body = HealthResponse)
    )
)]
pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.cache.stats();
    Json(HealthResponse {
        status: "healthy".to_string(),
        cache: CacheStatsResponse {
            hits: stats.hits,
            misses: stats.misses,
            hit_ratio: stats.hit_ratio,
            size: stats.size,
        },
    })
}
