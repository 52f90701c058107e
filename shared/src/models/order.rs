//! Order and line-item models

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::DispatchStatus;

/// A purchase-order record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// Client-issued purchase-order number, unique ignoring case
    pub po_no: String,
    pub po_date: Option<NaiveDate>,
    pub client_name: String,
    /// Flat `name xQTY; ...` rendering of the order's products
    pub product_details: String,
    /// Total quantity; equals the sum of item quantities when items exist
    pub qty: i64,
    pub dispatch_status: DispatchStatus,
    pub invoice_no: String,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_amount: Decimal,
    /// Free text, conventionally "Pending" or "Received"
    pub payment_status: String,
    pub delivered_items: String,
    pub undelivered_items: String,
    pub items: Vec<OrderItem>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One product-quantity-price line belonging to an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_name: String,
    pub qty: i64,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub remarks: String,
}

/// Aggregate payment-status counts across all orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub total: i64,
    pub received: i64,
    pub pending: i64,
}

/// Outcome of a CSV import batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    /// Data rows read from the file, including ones that were skipped
    pub processed: u64,
    /// Rows actually persisted
    pub inserted: u64,
    /// Rows dropped: missing PO number, duplicate PO number, or unparseable
    pub skipped: u64,
}
