//! Request and response bodies for the HTTP API.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CalculateRequest {
    /// Ordered quantity to cover with whole packs.
    pub amount: i64,
}

/// Calculation result. `packs` maps decimal pack sizes to positive counts.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CalculateResponse {
    pub amount: u64,
    pub total_items: u64,
    pub total_packs: u64,
    pub packs: BTreeMap<u64, u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AddPackSizeRequest {
    pub size: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub cache: CacheStatsResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
    pub size: usize,
}
