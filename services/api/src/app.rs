//! HTTP application wiring.
//!
//! # Purpose
//! Builds the axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Middleware layout
//! `/health` gets CORS only. Everything under `/api` additionally gets gzip
//! compression and per-client rate limiting; the pack administration routes
//! also pass the optional API-key gate. Request tracing wraps the whole
//! router.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::coordinator::{CachedSolution, RequestCoordinator};
use crate::middleware::{RateLimiter, rate_limit, require_api_key};
use crate::observability;
use crate::store::CalculatorStore;
use axum::Router;
use axum::routing::{delete, get, post};
use packwise_cache::ResultCache;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CalculatorStore + Send + Sync>,
    pub cache: Arc<dyn ResultCache<CachedSolution>>,
    pub coordinator: Arc<RequestCoordinator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub api_key: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    let admin = Router::new()
        .route(
            "/api/packs",
            get(api::packs::list_pack_sizes).post(api::packs::add_pack_size),
        )
        .route("/api/packs/:size", delete(api::packs::delete_pack_size))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let api_routes = Router::new()
        .route("/api/calculate", post(api::calculate::calculate))
        .route("/api/orders", get(api::orders::list_orders))
        .merge(admin)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit,
        ))
        .layer(CompressionLayer::new());

    Router::new()
        .route("/health", get(api::system::health))
        .merge(api_routes)
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs")
                .url("/api/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .layer(trace_layer)
        .with_state(state)
}
