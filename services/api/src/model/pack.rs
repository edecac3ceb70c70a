//! Pack-size model.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A configured pack size. Sizes are unique across the set and at least 1.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PackSize {
    pub id: i64,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}
