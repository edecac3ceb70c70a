//! OpenAPI document for the pack calculation API.
use crate::api::types::{
    AddPackSizeRequest, CacheStatsResponse, CalculateRequest, CalculateResponse, ErrorResponse,
    HealthResponse, MessageResponse,
};
use crate::model::{OrderRecord, PackSize};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "packwise-api",
        version = "v1",
        description = "Pack calculation HTTP API"
    ),
    paths(
        crate::api::calculate::calculate,
        crate::api::packs::list_pack_sizes,
        crate::api::packs::add_pack_size,
        crate::api::packs::delete_pack_size,
        crate::api::orders::list_orders,
        crate::api::system::health
    ),
    components(schemas(
        CalculateRequest,
        CalculateResponse,
        AddPackSizeRequest,
        MessageResponse,
        ErrorResponse,
        HealthResponse,
        CacheStatsResponse,
        PackSize,
        OrderRecord
    )),
    tags(
        (name = "calculate", description = "Pack calculations"),
        (name = "packs", description = "Pack size administration"),
        (name = "orders", description = "Calculation history"),
        (name = "system", description = "Health and diagnostics")
    )
)]
pub struct ApiDoc;
