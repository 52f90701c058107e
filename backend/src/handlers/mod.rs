//! HTTP handlers for the Order Records API

pub mod health;
pub mod interchange;
pub mod orders;

pub use health::*;
pub use interchange::*;
pub use orders::*;
