//! Order journal records.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// A completed calculation as appended to the journal.
///
/// `packs` is the chosen multiset keyed by pack size; in JSON it serializes
/// as an object with decimal string keys.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: i64,
    pub amount: u64,
    pub total_items: u64,
    pub total_packs: u64,
    pub packs: BTreeMap<u64, u64>,
    pub created_at: DateTime<Utc>,
}

/// Journal append payload; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub amount: u64,
    pub total_items: u64,
    pub total_packs: u64,
    pub packs: BTreeMap<u64, u64>,
}
