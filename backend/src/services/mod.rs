//! Business logic services for the Order Records backend

pub mod interchange;
pub mod orders;

pub use interchange::InterchangeService;
pub use orders::OrderService;
