//! CSV interchange codec: bulk export and alias-tolerant import
//!
//! Export writes a fixed column set. Import accepts files of unknown header
//! naming and resolves each semantic field through a prioritized alias list,
//! so spreadsheets exported from older schema variants keep loading.

use chrono::Local;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::Serialize;
use sqlx::SqlitePool;

use shared::dates::{format_date, normalize_date};
use shared::validation::{coerce_amount, coerce_qty, flatten_tokens, parse_product_details};

use crate::error::{AppError, AppResult};
use crate::models::{DispatchStatus, ImportReport, Order, ProductToken};
use crate::services::orders::{OrderFilter, OrderService};

/// Export column order, written even when the store is empty
const EXPORT_HEADERS: &[&str] = &[
    "PO No",
    "PO Date",
    "Client Name",
    "Product Details",
    "Qty",
    "Dispatch Status",
    "Invoice No",
    "Invoice Date",
    "Invoice Amount",
    "Payment Status",
    "Delivered Items",
    "Undelivered Items",
];

// Header aliases per semantic field; the first alias present in a file wins.
// Comparison is against trimmed, lowercased headers.
const PO_NO_ALIASES: &[&str] = &["po_no", "order_number", "po no", "po no.", "order number", "po"];
const PO_DATE_ALIASES: &[&str] = &["po_date", "order_date", "po date", "order date", "date"];
const CLIENT_ALIASES: &[&str] = &[
    "client_name",
    "company_name",
    "client name",
    "company name",
    "client",
];
const PRODUCT_ALIASES: &[&str] = &["product_details", "product details", "products", "items"];
const QTY_ALIASES: &[&str] = &["qty", "quantity"];
const DISPATCH_ALIASES: &[&str] = &[
    "dispatch_status",
    "dispatch status",
    "dispatch/delivered",
    "status",
];
const INVOICE_NO_ALIASES: &[&str] = &["invoice_no", "invoice no", "invoice number"];
const INVOICE_DATE_ALIASES: &[&str] = &["invoice_date", "invoice date"];
const INVOICE_AMOUNT_ALIASES: &[&str] = &["invoice_amount", "invoice amount", "amount"];
const PAYMENT_ALIASES: &[&str] = &["payment_status", "payment status", "payment"];
const DELIVERED_ALIASES: &[&str] = &["delivered_items", "delivered items"];
const UNDELIVERED_ALIASES: &[&str] = &["undelivered_items", "undelivered items"];

/// Interchange service for CSV import and export
#[derive(Clone)]
pub struct InterchangeService {
    db: SqlitePool,
}

/// One exported order row
#[derive(Serialize)]
struct ExportRow {
    po_no: String,
    po_date: String,
    client_name: String,
    product_details: String,
    qty: i64,
    dispatch_status: &'static str,
    invoice_no: String,
    invoice_date: String,
    invoice_amount: String,
    payment_status: String,
    delivered_items: String,
    undelivered_items: String,
}

impl From<&Order> for ExportRow {
    fn from(order: &Order) -> Self {
        ExportRow {
            po_no: order.po_no.clone(),
            po_date: format_date(order.po_date),
            client_name: order.client_name.clone(),
            product_details: order.product_details.clone(),
            qty: order.qty,
            dispatch_status: order.dispatch_status.as_str(),
            invoice_no: order.invoice_no.clone(),
            invoice_date: format_date(order.invoice_date),
            invoice_amount: order.invoice_amount.to_string(),
            payment_status: order.payment_status.clone(),
            delivered_items: order.delivered_items.clone(),
            undelivered_items: order.undelivered_items.clone(),
        }
    }
}

/// Resolved column index per semantic field
struct ColumnMap {
    po_no: Option<usize>,
    po_date: Option<usize>,
    client_name: Option<usize>,
    product_details: Option<usize>,
    qty: Option<usize>,
    dispatch_status: Option<usize>,
    invoice_no: Option<usize>,
    invoice_date: Option<usize>,
    invoice_amount: Option<usize>,
    payment_status: Option<usize>,
    delivered_items: Option<usize>,
    undelivered_items: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|header| header == alias))
        };

        ColumnMap {
            po_no: find(PO_NO_ALIASES),
            po_date: find(PO_DATE_ALIASES),
            client_name: find(CLIENT_ALIASES),
            product_details: find(PRODUCT_ALIASES),
            qty: find(QTY_ALIASES),
            dispatch_status: find(DISPATCH_ALIASES),
            invoice_no: find(INVOICE_NO_ALIASES),
            invoice_date: find(INVOICE_DATE_ALIASES),
            invoice_amount: find(INVOICE_AMOUNT_ALIASES),
            payment_status: find(PAYMENT_ALIASES),
            delivered_items: find(DELIVERED_ALIASES),
            undelivered_items: find(UNDELIVERED_ALIASES),
        }
    }
}

fn field<'r>(record: &'r StringRecord, index: Option<usize>) -> &'r str {
    index.and_then(|i| record.get(i)).unwrap_or("").trim()
}

impl InterchangeService {
    /// Create a new InterchangeService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Serialize the full order collection to CSV text
    pub async fn export_csv(&self) -> AppResult<String> {
        let orders = OrderService::new(self.db.clone())
            .list_orders(&OrderFilter::default())
            .await?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(vec![]);
        writer
            .write_record(EXPORT_HEADERS)
            .map_err(|e| AppError::Internal(format!("CSV write error: {}", e)))?;
        for order in &orders {
            writer
                .serialize(ExportRow::from(order))
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }

    /// Import a CSV batch.
    ///
    /// Rows without a resolvable PO number and rows whose PO number already
    /// exists are skipped, never batch-aborting. The report keeps rows-read
    /// and rows-inserted as separate counts.
    pub async fn import_csv(&self, data: &str) -> AppResult<ImportReport> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(data.as_bytes());
        let headers = reader
            .headers()
            .map_err(|e| AppError::validation("file", format!("Unreadable CSV header: {}", e)))?
            .clone();
        let columns = ColumnMap::resolve(&headers);

        let mut report = ImportReport {
            processed: 0,
            inserted: 0,
            skipped: 0,
        };
        for record in reader.records() {
            report.processed += 1;
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    report.skipped += 1;
                    tracing::warn!("Skipping unparseable CSV row: {}", e);
                    continue;
                }
            };

            let po_no = field(&record, columns.po_no);
            if po_no.is_empty() {
                report.skipped += 1;
                continue;
            }

            if self.insert_row(po_no, &record, &columns).await? {
                report.inserted += 1;
            } else {
                report.skipped += 1;
            }
        }

        tracing::info!(
            processed = report.processed,
            inserted = report.inserted,
            skipped = report.skipped,
            "CSV import finished"
        );
        Ok(report)
    }

    /// Insert one row, returning false when the PO number was already taken
    async fn insert_row(
        &self,
        po_no: &str,
        record: &StringRecord,
        columns: &ColumnMap,
    ) -> AppResult<bool> {
        let po_date = normalize_date(field(record, columns.po_date));
        let invoice_date = normalize_date(field(record, columns.invoice_date));
        let invoice_amount = coerce_amount(field(record, columns.invoice_amount));
        let dispatch_status = DispatchStatus::from_str(field(record, columns.dispatch_status))
            .unwrap_or_default();
        let payment_status = match field(record, columns.payment_status) {
            "" => "Pending",
            status => status,
        };

        let tokens = parse_product_details(field(record, columns.product_details));
        let has_item_quantities = tokens.iter().any(|t| t.qty.is_some());
        let (qty, product_details, items) = if has_item_quantities {
            // Tokens carrying explicit quantities become line items; a bare
            // token among them counts as one unit.
            let items: Vec<ProductToken> = tokens
                .into_iter()
                .map(|t| ProductToken {
                    qty: Some(t.qty.unwrap_or(1)),
                    name: t.name,
                })
                .collect();
            let qty = items.iter().filter_map(|t| t.qty).sum();
            let flat = flatten_tokens(&items);
            (qty, flat, items)
        } else {
            let qty = coerce_qty(field(record, columns.qty));
            (qty, flatten_tokens(&tokens), Vec::new())
        };

        let now = Local::now().naive_local();
        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO orders (po_no, po_date, client_name, product_details, qty,
                                          dispatch_status, invoice_no, invoice_date,
                                          invoice_amount, payment_status, delivered_items,
                                          undelivered_items, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(po_no)
        .bind(po_date)
        .bind(field(record, columns.client_name))
        .bind(&product_details)
        .bind(qty)
        .bind(dispatch_status.as_str())
        .bind(field(record, columns.invoice_no))
        .bind(invoice_date)
        .bind(invoice_amount.to_string())
        .bind(payment_status)
        .bind(field(record, columns.delivered_items))
        .bind(field(record, columns.undelivered_items))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let order_id = result.last_insert_rowid();
        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_name, qty, unit_price, total_price, remarks)
                VALUES (?, ?, ?, '0', '0', '')
                "#,
            )
            .bind(order_id)
            .bind(&item.name)
            .bind(item.qty)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(true)
    }
}
