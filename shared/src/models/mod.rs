//! Domain models for the Order Records tracker

mod order;

pub use order::*;
