//! Pure domain helpers for order records
//!
//! Everything here is side-effect free; the backend services persist
//! whatever these functions compute.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::models::OrderItem;
use crate::types::{DispatchBreakdown, DispatchStatus, ProductToken};

/// Separator between product tokens in flat strings
const TOKEN_SEPARATOR: &str = "; ";

/// Validate a purchase-order number
pub fn validate_po_no(po_no: &str) -> Result<(), &'static str> {
    let trimmed = po_no.trim();
    if trimmed.is_empty() {
        return Err("PO number cannot be empty");
    }
    if trimmed.len() > 50 {
        return Err("PO number must be at most 50 characters");
    }
    Ok(())
}

/// Partition an order's products into delivered and undelivered sets and
/// derive the dispatch status from the counts.
///
/// The all-delivered comparison runs before the none-delivered one, so an
/// order without any product tokens derives `Delivered`.
pub fn derive_dispatch(products: &[String], delivered: &[String]) -> DispatchBreakdown {
    let delivered_set: HashSet<&str> = delivered.iter().map(|s| s.trim()).collect();

    let mut delivered_items = Vec::new();
    let mut undelivered_items = Vec::new();
    for product in products {
        let token = product.trim();
        if token.is_empty() {
            continue;
        }
        if delivered_set.contains(token) {
            delivered_items.push(token);
        } else {
            undelivered_items.push(token);
        }
    }

    let total = delivered_items.len() + undelivered_items.len();
    let status = if delivered_items.len() == total {
        DispatchStatus::Delivered
    } else if delivered_items.is_empty() {
        DispatchStatus::Pending
    } else {
        DispatchStatus::Partial
    };

    DispatchBreakdown {
        status,
        delivered_items: delivered_items.join(TOKEN_SEPARATOR),
        undelivered_items: undelivered_items.join(TOKEN_SEPARATOR),
    }
}

/// Split a flat product-details string into tokens.
///
/// A token shaped `<name> x<digits>` carries an explicit quantity; anything
/// else is a bare product name.
pub fn parse_product_details(details: &str) -> Vec<ProductToken> {
    details
        .split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|token| match split_qty_suffix(token) {
            Some((name, qty)) => ProductToken {
                name: name.to_string(),
                qty: Some(qty),
            },
            None => ProductToken {
                name: token.to_string(),
                qty: None,
            },
        })
        .collect()
}

fn split_qty_suffix(token: &str) -> Option<(&str, i64)> {
    let (name, suffix) = token.rsplit_once(" x")?;
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let name = name.trim_end();
    if name.is_empty() {
        return None;
    }
    Some((name, suffix.parse().ok()?))
}

/// Render product tokens back into the flat `name xQTY; ...` form
pub fn flatten_tokens(tokens: &[ProductToken]) -> String {
    tokens
        .iter()
        .map(|token| match token.qty {
            Some(qty) => format!("{} x{}", token.name, qty),
            None => token.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(TOKEN_SEPARATOR)
}

/// Product names for dispatch reconciliation: item names when the order has
/// line items, parsed tokens of the flat string otherwise.
pub fn product_names(product_details: &str, items: &[OrderItem]) -> Vec<String> {
    if items.is_empty() {
        parse_product_details(product_details)
            .into_iter()
            .map(|t| t.name)
            .collect()
    } else {
        items.iter().map(|i| i.product_name.clone()).collect()
    }
}

/// Best-effort quantity coercion: integer parse, then float truncation,
/// anything else counts as zero.
pub fn coerce_qty(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return n;
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() {
            return f.trunc() as i64;
        }
    }
    0
}

/// Lenient decimal parse for money columns; unparseable input is zero.
pub fn coerce_amount(raw: &str) -> Decimal {
    raw.trim().parse::<Decimal>().unwrap_or_default()
}
