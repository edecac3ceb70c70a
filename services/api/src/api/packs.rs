//! Pack-size administration endpoints.
//!
//! Any mutation here invalidates the result cache before the response is
//! produced, so no cached calculation can reflect a stale configuration.
use crate::api::error::{
    ApiError, api_bad_request, api_conflict, api_internal, api_not_found,
};
use crate::api::types::{AddPackSizeRequest, MessageResponse};
use crate::app::AppState;
use crate::model::PackSize;
use crate::store::{PackStore as _, StoreError};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use packwise_cache::ResultCache;

#[utoipa::path(
    get,
    path = "/api/packs",
    tag = "packs",
    responses(
        (status = 200, description = "Configured pack sizes, ascending", body = [PackSize]),
        (status = 500, description = "Internal error", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_pack_sizes(
    State(state): State<AppState>,
) -> Result<Json<Vec<PackSize>>, ApiError> {
    let items = state
        .store
        .list_pack_sizes()
        .await
        .map_err(|err| api_internal("failed to list pack sizes", &err))?;
    Ok(Json(items))
}

#[utoipa::path(
    post,
    path = "/api/packs",
    tag = "packs",
    request_body = AddPackSizeRequest,
    responses(
        (status = 201, description = "Pack size added", body = MessageResponse),
        (status = 400, description = "Invalid size", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Pack size already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn add_pack_size(
    State(state): State<AppState>,
    body: Result<Json<AddPackSizeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|_| api_bad_request("invalid request body"))?;
    if request.size < 1 {
        return Err(api_bad_request("size must be at least 1"));
    }
    match state.store.add_pack_size(request.size as u64).await {
        Ok(_) => {
            // The configuration changed; drop every cached calculation
            // before this response leaves the process.
            state.cache.clear();
            Ok((
                StatusCode::CREATED,
                Json(MessageResponse {
                    message: "pack size added".to_string(),
                }),
            ))
        }
        Err(StoreError::Conflict(_)) => Err(api_conflict("pack size already exists")),
        Err(err) => Err(api_internal("failed to add pack size", &err)),
    }
}

#[utoipa::path(
    delete,
    path = "/api/packs/{size}",
    tag = "packs",
    params(
        ("size" = String, Path, description = "Pack size to remove")
    ),
    responses(
        (status = 200, description = "Pack size deleted", body = MessageResponse),
        (status = 400, description = "Malformed size", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Pack size not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_pack_size(
    Path(size): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let size: u64 = size
        .parse()
        .map_err(|_| api_bad_request("invalid pack size"))?;
    match state.store.delete_pack_size(size).await {
        Ok(()) => {
            // Same invalidation rule as additions.
            state.cache.clear();
            Ok(Json(MessageResponse {
                message: "pack size deleted".to_string(),
            }))
        }
        Err(StoreError::NotFound(_)) => Err(api_not_found("pack size not found")),
        Err(err) => Err(api_internal("failed to delete pack size", &err)),
    }
}
