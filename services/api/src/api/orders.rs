//! Order history endpoint.
use crate::api::error::{ApiError, api_internal};
use crate::app::AppState;
use crate::model::OrderRecord;
use crate::store::OrderJournal as _;
use axum::Json;
use axum::extract::{Query, State};
use std::collections::HashMap;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "orders",
    params(
        ("limit" = Option<u32>, Query, description = "Maximum records, most recent first (default 100, max 1000)")
    ),
    responses(
        (status = 200, description = "Recent calculations, most recent first", body = [OrderRecord]),
        (status = 500, description = "Internal error", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_orders(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderRecord>>, ApiError> {
    let limit = params
        .get("limit")
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|&limit| limit > 0)
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT);
    let orders = state
        .store
        .recent_orders(limit)
        .await
        .map_err(|err| api_internal("failed to load orders", &err))?;
    Ok(Json(orders))
}
