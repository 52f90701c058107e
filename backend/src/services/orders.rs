//! Order store service: durable CRUD over orders and their line items

use std::collections::HashMap;

use chrono::{Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use validator::Validate;

use shared::dates::normalize_date;
use shared::validation::{
    coerce_amount, derive_dispatch, flatten_tokens, product_names, validate_po_no,
};

use crate::error::{AppError, AppResult};
use crate::models::{DispatchStatus, Order, OrderItem, PaymentSummary, ProductToken};

const ORDER_COLUMNS: &str = "id, po_no, po_date, client_name, product_details, qty, \
     dispatch_status, invoice_no, invoice_date, invoice_amount, payment_status, \
     delivered_items, undelivered_items, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_name, qty, unit_price, total_price, remarks";

/// Order service for managing purchase-order records
#[derive(Clone)]
pub struct OrderService {
    db: SqlitePool,
}

/// Write payload for create and full-record update.
///
/// Updates replace every field; anything the caller omits lands on its
/// empty/zero default rather than being merged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct OrderPayload {
    pub po_no: Option<String>,
    pub po_date: Option<String>,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub product_details: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub qty: i64,
    pub dispatch_status: Option<String>,
    #[serde(default)]
    pub invoice_no: String,
    pub invoice_date: Option<String>,
    pub invoice_amount: Option<String>,
    pub payment_status: Option<String>,
    #[serde(default)]
    pub delivered_items: String,
    #[serde(default)]
    pub undelivered_items: String,
    #[serde(default)]
    #[validate]
    pub items: Vec<OrderItemPayload>,
}

/// One line item in a write payload
#[derive(Debug, Deserialize, Validate)]
pub struct OrderItemPayload {
    pub product_name: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Item quantity cannot be negative"))]
    pub qty: i64,
    pub unit_price: Option<String>,
    pub total_price: Option<String>,
    #[serde(default)]
    pub remarks: String,
}

/// Delivered subset recorded from a dispatch reconciliation
#[derive(Debug, Deserialize)]
pub struct DispatchPayload {
    #[serde(default)]
    pub delivered: Vec<String>,
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    /// Case-insensitive substring over po_no, client_name and product_details
    pub q: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

/// Scalar order columns as stored; amounts live as TEXT in SQLite
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    po_no: String,
    po_date: Option<NaiveDate>,
    client_name: String,
    product_details: String,
    qty: i64,
    dispatch_status: String,
    invoice_no: String,
    invoice_date: Option<NaiveDate>,
    invoice_amount: String,
    payment_status: String,
    delivered_items: String,
    undelivered_items: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    order_id: i64,
    product_name: String,
    qty: i64,
    unit_price: String,
    total_price: String,
    remarks: String,
}

/// Normalized field values ready to be written
struct OrderValues {
    po_no: String,
    po_date: Option<NaiveDate>,
    client_name: String,
    product_details: String,
    qty: i64,
    dispatch_status: DispatchStatus,
    invoice_no: String,
    invoice_date: Option<NaiveDate>,
    invoice_amount: Decimal,
    payment_status: String,
    delivered_items: String,
    undelivered_items: String,
    items: Vec<ItemValues>,
}

struct ItemValues {
    product_name: String,
    qty: i64,
    unit_price: Decimal,
    total_price: Decimal,
    remarks: String,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            po_no: self.po_no,
            po_date: self.po_date,
            client_name: self.client_name,
            product_details: self.product_details,
            qty: self.qty,
            dispatch_status: DispatchStatus::from_str(&self.dispatch_status).unwrap_or_default(),
            invoice_no: self.invoice_no,
            invoice_date: self.invoice_date,
            invoice_amount: coerce_amount(&self.invoice_amount),
            payment_status: self.payment_status,
            delivered_items: self.delivered_items,
            undelivered_items: self.undelivered_items,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<ItemRow> for OrderItem {
    fn from(row: ItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_name: row.product_name,
            qty: row.qty,
            unit_price: coerce_amount(&row.unit_price),
            total_price: coerce_amount(&row.total_price),
            remarks: row.remarks,
        }
    }
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// List orders, newest first unless the caller picks a sort key
    pub async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        let mut sql = format!("SELECT {} FROM orders", ORDER_COLUMNS);
        let search = filter.q.as_deref().map(str::trim).filter(|s| !s.is_empty());
        if search.is_some() {
            sql.push_str(
                " WHERE lower(po_no) LIKE ? OR lower(client_name) LIKE ? \
                 OR lower(product_details) LIKE ?",
            );
        }
        sql.push_str(&order_clause(filter));

        let mut query = sqlx::query_as::<_, OrderRow>(&sql);
        if let Some(term) = search {
            let pattern = format!("%{}%", term.to_lowercase());
            query = query
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern);
        }
        let rows = query.fetch_all(&self.db).await?;

        // One grouped fetch instead of a query per order
        let item_rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM order_items ORDER BY order_id, id",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        let mut items_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            items_by_order.entry(row.order_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }

    /// Get an order by id
    pub async fn get_order(&self, order_id: i64) -> AppResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = ?",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let items = self.load_items(order_id).await?;
        Ok(row.into_order(items))
    }

    /// Create a new order together with its line items
    pub async fn create_order(&self, payload: OrderPayload) -> AppResult<Order> {
        let values = prepare_values(payload)?;

        // Friendly duplicate pre-check; the NOCASE unique constraint stays
        // the authoritative guard under concurrent creates.
        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM orders WHERE po_no = ?")
            .bind(&values.po_no)
            .fetch_optional(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AppError::DuplicatePo(values.po_no));
        }

        let now = Local::now().naive_local();
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO orders (po_no, po_date, client_name, product_details, qty,
                                dispatch_status, invoice_no, invoice_date, invoice_amount,
                                payment_status, delivered_items, undelivered_items,
                                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&values.po_no)
        .bind(values.po_date)
        .bind(&values.client_name)
        .bind(&values.product_details)
        .bind(values.qty)
        .bind(values.dispatch_status.as_str())
        .bind(&values.invoice_no)
        .bind(values.invoice_date)
        .bind(values.invoice_amount.to_string())
        .bind(&values.payment_status)
        .bind(&values.delivered_items)
        .bind(&values.undelivered_items)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, &values.po_no))?;

        let order_id = result.last_insert_rowid();
        insert_items(&mut tx, order_id, &values.items).await?;
        tx.commit().await?;

        tracing::info!(order_id, po_no = %values.po_no, "Order created");
        self.get_order(order_id).await
    }

    /// Replace an order's full record, including its line-item set
    pub async fn update_order(&self, order_id: i64, payload: OrderPayload) -> AppResult<Order> {
        let values = prepare_values(payload)?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("Order".to_string()));
        }

        let now = Local::now().naive_local();
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            UPDATE orders
            SET po_no = ?, po_date = ?, client_name = ?, product_details = ?, qty = ?,
                dispatch_status = ?, invoice_no = ?, invoice_date = ?, invoice_amount = ?,
                payment_status = ?, delivered_items = ?, undelivered_items = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&values.po_no)
        .bind(values.po_date)
        .bind(&values.client_name)
        .bind(&values.product_details)
        .bind(values.qty)
        .bind(values.dispatch_status.as_str())
        .bind(&values.invoice_no)
        .bind(values.invoice_date)
        .bind(values.invoice_amount.to_string())
        .bind(&values.payment_status)
        .bind(&values.delivered_items)
        .bind(&values.undelivered_items)
        .bind(now)
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, &values.po_no))?;

        // Line items are replaced wholesale, never patched
        sqlx::query("DELETE FROM order_items WHERE order_id = ?")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        insert_items(&mut tx, order_id, &values.items).await?;
        tx.commit().await?;

        tracing::info!(order_id, "Order updated");
        self.get_order(order_id).await
    }

    /// Delete an order and its line items; missing ids are a no-op
    pub async fn delete_order(&self, order_id: i64) -> AppResult<u64> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM order_items WHERE order_id = ?")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::info!(order_id, "Order deleted");
        }
        Ok(deleted)
    }

    /// Persist a dispatch reconciliation: the caller supplies the delivered
    /// subset, the partition and status are derived from it.
    pub async fn record_dispatch(&self, order_id: i64, delivered: Vec<String>) -> AppResult<Order> {
        let order = self.get_order(order_id).await?;
        let products = product_names(&order.product_details, &order.items);
        let breakdown = derive_dispatch(&products, &delivered);

        let now = Local::now().naive_local();
        sqlx::query(
            "UPDATE orders SET dispatch_status = ?, delivered_items = ?, \
             undelivered_items = ?, updated_at = ? WHERE id = ?",
        )
        .bind(breakdown.status.as_str())
        .bind(&breakdown.delivered_items)
        .bind(&breakdown.undelivered_items)
        .bind(now)
        .bind(order_id)
        .execute(&self.db)
        .await?;

        tracing::info!(order_id, status = breakdown.status.as_str(), "Dispatch recorded");
        self.get_order(order_id).await
    }

    /// Aggregate payment-status counts.
    ///
    /// Substring matching mirrors the historical free-text data: an order
    /// can fall in neither bucket, or in both.
    pub async fn payment_summary(&self) -> AppResult<PaymentSummary> {
        let (total, received, pending): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE instr(lower(payment_status), 'received') > 0),
                   COUNT(*) FILTER (WHERE instr(lower(payment_status), 'pending') > 0)
            FROM orders
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(PaymentSummary {
            total,
            received,
            pending,
        })
    }

    async fn load_items(&self, order_id: i64) -> AppResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM order_items WHERE order_id = ? ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }
}

/// Validate and normalize a write payload.
///
/// When line items are present the order quantity is their sum and the flat
/// product string is re-rendered from them; otherwise the caller's flat
/// fields are taken as given.
fn prepare_values(payload: OrderPayload) -> AppResult<OrderValues> {
    payload
        .validate()
        .map_err(|e| AppError::validation("payload", e.to_string()))?;

    let po_no = payload.po_no.as_deref().unwrap_or("").trim().to_string();
    validate_po_no(&po_no).map_err(|msg| AppError::validation("po_no", msg))?;

    let items: Vec<ItemValues> = payload
        .items
        .into_iter()
        .filter(|item| !item.product_name.trim().is_empty())
        .map(|item| {
            let unit_price = item
                .unit_price
                .as_deref()
                .map(coerce_amount)
                .unwrap_or_default();
            let total_price = item
                .total_price
                .as_deref()
                .map(coerce_amount)
                .unwrap_or_else(|| unit_price * Decimal::from(item.qty));
            ItemValues {
                product_name: item.product_name.trim().to_string(),
                qty: item.qty,
                unit_price,
                total_price,
                remarks: item.remarks.trim().to_string(),
            }
        })
        .collect();

    let (qty, product_details) = if items.is_empty() {
        (payload.qty, payload.product_details.trim().to_string())
    } else {
        let tokens: Vec<ProductToken> = items
            .iter()
            .map(|item| ProductToken {
                name: item.product_name.clone(),
                qty: (item.qty > 0).then_some(item.qty),
            })
            .collect();
        (items.iter().map(|i| i.qty).sum(), flatten_tokens(&tokens))
    };

    Ok(OrderValues {
        po_no,
        po_date: payload.po_date.as_deref().and_then(normalize_date),
        client_name: payload.client_name.trim().to_string(),
        product_details,
        qty,
        dispatch_status: payload
            .dispatch_status
            .as_deref()
            .and_then(DispatchStatus::from_str)
            .unwrap_or_default(),
        invoice_no: payload.invoice_no.trim().to_string(),
        invoice_date: payload.invoice_date.as_deref().and_then(normalize_date),
        invoice_amount: payload
            .invoice_amount
            .as_deref()
            .map(coerce_amount)
            .unwrap_or_default(),
        payment_status: payload
            .payment_status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Pending".to_string()),
        delivered_items: payload.delivered_items.trim().to_string(),
        undelivered_items: payload.undelivered_items.trim().to_string(),
        items,
    })
}

async fn insert_items(
    tx: &mut Transaction<'_, Sqlite>,
    order_id: i64,
    items: &[ItemValues],
) -> AppResult<()> {
    for item in items {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_name, qty, unit_price, total_price, remarks)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order_id)
        .bind(&item.product_name)
        .bind(item.qty)
        .bind(item.unit_price.to_string())
        .bind(item.total_price.to_string())
        .bind(&item.remarks)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn map_unique_violation(e: sqlx::Error, po_no: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::DuplicatePo(po_no.to_string())
        }
        _ => AppError::Database(e),
    }
}

/// Sort clause from a whitelisted column name; anything else falls back to
/// newest-first.
fn order_clause(filter: &OrderFilter) -> String {
    let column = match filter.sort_by.as_deref() {
        Some("po_no") => "po_no",
        Some("po_date") => "po_date",
        Some("client_name") => "client_name",
        Some("qty") => "qty",
        Some("dispatch_status") => "dispatch_status",
        Some("invoice_no") => "invoice_no",
        Some("invoice_date") => "invoice_date",
        // Amounts are stored as TEXT, compare numerically
        Some("invoice_amount") => "CAST(invoice_amount AS REAL)",
        Some("payment_status") => "payment_status",
        Some("created_at") => "created_at",
        _ => return " ORDER BY id DESC".to_string(),
    };
    let direction = match filter.order.as_deref() {
        Some(o) if o.eq_ignore_ascii_case("desc") => "DESC",
        _ => "ASC",
    };
    format!(" ORDER BY {} {}", column, direction)
}
