//! HTTP API module.
//!
//! # Purpose
//! Exposes one handler module per resource plus the shared error and body
//! types used across them.
//!
//! # Key invariants
//! - Pack-size mutations clear the result cache before responding.
//! - Error shapes are standardized via `api::error`.
pub mod calculate;
pub mod error;
pub mod openapi;
pub mod orders;
pub mod packs;
pub mod system;
pub mod types;
