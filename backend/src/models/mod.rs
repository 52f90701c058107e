//! Database models for the Order Records backend
//!
//! Re-exports models and domain types from the shared crate

pub use shared::models::*;
pub use shared::types::*;
