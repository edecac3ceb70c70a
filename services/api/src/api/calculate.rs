//! Pack calculation endpoint.
use crate::api::error::{ApiError, api_bad_request, api_internal, api_internal_message};
use crate::api::types::{CalculateRequest, CalculateResponse};
use crate::app::AppState;
use crate::coordinator::CalcError;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

#[utoipa::path(
    post,
    path = "/api/calculate",
    tag = "calculate",
    request_body = CalculateRequest,
    responses(
        (status = 200, description = "Optimal pack combination", body = CalculateResponse),
        (status = 400, description = "Invalid amount or empty configuration", body = crate::api::types::ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Internal error", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn calculate(
    State(state): State<AppState>,
    body: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let Json(request) = body.map_err(|_| api_bad_request("invalid request body"))?;
    match state.coordinator.calculate(request.amount).await {
        Ok(calculation) => Ok(Json(CalculateResponse {
            amount: calculation.amount,
            total_items: calculation.total_items,
            total_packs: calculation.total_packs,
            packs: calculation.packs,
        })),
        Err(err @ (CalcError::InvalidAmount | CalcError::AmountTooLarge | CalcError::NoConfig)) => {
            Err(api_bad_request(&err.to_string()))
        }
        Err(CalcError::Store(err)) => Err(api_internal("failed to load pack sizes", &err)),
        Err(CalcError::Internal) => Err(api_internal_message("calculation failed")),
    }
}
