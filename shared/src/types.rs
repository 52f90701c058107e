//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Delivery completion state of an order's products
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DispatchStatus {
    #[default]
    Pending,
    Partial,
    Delivered,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Pending => "Pending",
            DispatchStatus::Partial => "Partial",
            DispatchStatus::Delivered => "Delivered",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(DispatchStatus::Pending),
            "partial" => Some(DispatchStatus::Partial),
            "delivered" => Some(DispatchStatus::Delivered),
            _ => None,
        }
    }
}

/// One product entry parsed out of a flat product-details string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductToken {
    pub name: String,
    /// Explicit quantity from a `name xN` suffix, absent for bare names
    pub qty: Option<i64>,
}

/// Result of partitioning an order's products into delivered and pending sets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchBreakdown {
    pub status: DispatchStatus,
    pub delivered_items: String,
    pub undelivered_items: String,
}
