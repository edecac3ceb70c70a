//! Pack calculation data model.
//!
//! # Purpose
//! Re-exports the pack-size and order-record models shared by the API and
//! store layers.
mod order;
mod pack;

pub use order::{NewOrder, OrderRecord};
pub use pack::PackSize;
