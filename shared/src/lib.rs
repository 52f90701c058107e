//! Shared types and models for the Order Records tracker
//!
//! This crate contains the domain models and the pure helpers (dispatch
//! derivation, date normalization, product-token parsing) used by the
//! backend and its tests.

pub mod dates;
pub mod models;
pub mod types;
pub mod validation;

pub use dates::*;
pub use models::*;
pub use types::*;
pub use validation::*;
