//! CSV interchange integration tests
//!
//! Export header stability, export/import round trips, header-alias
//! resolution, and the skip rules for unusable or duplicate rows.

use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use order_records_backend::services::interchange::InterchangeService;
use order_records_backend::services::orders::{
    OrderFilter, OrderItemPayload, OrderPayload, OrderService,
};

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

fn payload(po_no: &str) -> OrderPayload {
    OrderPayload {
        po_no: Some(po_no.to_string()),
        ..OrderPayload::default()
    }
}

fn item(name: &str, qty: i64, unit_price: &str) -> OrderItemPayload {
    OrderItemPayload {
        product_name: name.to_string(),
        qty,
        unit_price: Some(unit_price.to_string()),
        total_price: None,
        remarks: String::new(),
    }
}

// ============================================================================
// Export
// ============================================================================

#[tokio::test]
async fn export_writes_the_fixed_header_even_when_empty() {
    let service = InterchangeService::new(test_pool().await);

    let csv_text = service.export_csv().await.unwrap();

    let mut lines = csv_text.lines();
    assert_eq!(
        lines.next(),
        Some(
            "PO No,PO Date,Client Name,Product Details,Qty,Dispatch Status,\
             Invoice No,Invoice Date,Invoice Amount,Payment Status,\
             Delivered Items,Undelivered Items"
        )
    );
    assert_eq!(lines.next(), None);
}

#[tokio::test]
async fn export_renders_dates_iso_and_items_flattened() {
    let pool = test_pool().await;
    let orders = OrderService::new(pool.clone());

    orders
        .create_order(OrderPayload {
            po_date: Some("5/9/25".to_string()),
            client_name: "Acme Hotels".to_string(),
            items: vec![item("Beans", 10, "2.50"), item("Cups", 2, "0.75")],
            ..payload("PO-1001")
        })
        .await
        .unwrap();

    let csv_text = InterchangeService::new(pool).export_csv().await.unwrap();
    let data_line = csv_text.lines().nth(1).unwrap();

    assert!(data_line.starts_with("PO-1001,2025-09-05,Acme Hotels,Beans x10; Cups x2,12,"));
}

// ============================================================================
// Round trip
// ============================================================================

#[tokio::test]
async fn export_import_round_trip_reconstructs_equivalent_orders() {
    let pool = test_pool().await;
    let orders = OrderService::new(pool.clone());

    orders
        .create_order(OrderPayload {
            client_name: "Acme Hotels".to_string(),
            items: vec![item("Beans", 10, "2.50"), item("Cups", 2, "0.75")],
            ..payload("PO-1001")
        })
        .await
        .unwrap();
    orders
        .create_order(OrderPayload {
            client_name: "Blue Cafe".to_string(),
            product_details: "Beans; Cups".to_string(),
            qty: 5,
            ..payload("PO-1002")
        })
        .await
        .unwrap();

    let csv_text = InterchangeService::new(pool).export_csv().await.unwrap();

    let fresh = test_pool().await;
    let report = InterchangeService::new(fresh.clone())
        .import_csv(&csv_text)
        .await
        .unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 0);

    let restored = OrderService::new(fresh)
        .list_orders(&OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(restored.len(), 2);

    let with_items = restored.iter().find(|o| o.po_no == "PO-1001").unwrap();
    assert_eq!(with_items.client_name, "Acme Hotels");
    assert_eq!(with_items.qty, 12);
    // Line-item detail collapses to the flattened representation
    assert_eq!(with_items.product_details, "Beans x10; Cups x2");
    assert_eq!(with_items.items.len(), 2);

    let flat = restored.iter().find(|o| o.po_no == "PO-1002").unwrap();
    assert_eq!(flat.client_name, "Blue Cafe");
    assert_eq!(flat.qty, 5);
    assert!(flat.items.is_empty());
}

// ============================================================================
// Alias resolution and skip rules
// ============================================================================

#[tokio::test]
async fn import_resolves_header_aliases() {
    let pool = test_pool().await;

    let csv_text = "Order Number,Company Name,Quantity\nPO-900,Acme,4\n";
    let report = InterchangeService::new(pool.clone())
        .import_csv(csv_text)
        .await
        .unwrap();
    assert_eq!(report.inserted, 1);

    let orders = OrderService::new(pool)
        .list_orders(&OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(orders[0].po_no, "PO-900");
    assert_eq!(orders[0].client_name, "Acme");
    assert_eq!(orders[0].qty, 4);
}

#[tokio::test]
async fn rows_without_a_po_column_are_skipped() {
    let service = InterchangeService::new(test_pool().await);

    let csv_text = "Widget,Color\nhammer,red\nwrench,blue\n";
    let report = service.import_csv(csv_text).await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.skipped, 2);
}

#[tokio::test]
async fn rows_with_a_blank_po_value_are_skipped() {
    let service = InterchangeService::new(test_pool().await);

    let csv_text = "PO No,Client Name\n,No Number\nPO-1,Has Number\n";
    let report = service.import_csv(csv_text).await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn duplicate_po_numbers_are_dropped_not_errors() {
    let pool = test_pool().await;
    let orders = OrderService::new(pool.clone());
    orders.create_order(payload("PO-1")).await.unwrap();

    // One clash with a stored order (case differs) and one clash inside the batch
    let csv_text =
        "PO No,Client Name\npo-1,Clash With Store\nPO-2,Fresh\nPO-2,Clash In Batch\n";
    let report = InterchangeService::new(pool.clone())
        .import_csv(csv_text)
        .await
        .unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped, 2);

    let all = orders.list_orders(&OrderFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
}

// ============================================================================
// Field coercion during import
// ============================================================================

#[tokio::test]
async fn explicit_token_quantities_become_line_items() {
    let pool = test_pool().await;

    let csv_text = "PO No,Product Details,Qty\nPO-10,Beans x10; Cups,ignored\n";
    InterchangeService::new(pool.clone())
        .import_csv(csv_text)
        .await
        .unwrap();

    let orders = OrderService::new(pool)
        .list_orders(&OrderFilter::default())
        .await
        .unwrap();
    let order = &orders[0];
    // The bare token counts as one unit alongside the explicit ones
    assert_eq!(order.qty, 11);
    assert_eq!(order.product_details, "Beans x10; Cups x1");
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].product_name, "Beans");
    assert_eq!(order.items[0].qty, 10);
    assert_eq!(order.items[1].product_name, "Cups");
    assert_eq!(order.items[1].qty, 1);
}

#[tokio::test]
async fn unparseable_quantities_coerce_to_zero() {
    let pool = test_pool().await;

    let csv_text = "PO No,Qty\nPO-11,lots\n";
    InterchangeService::new(pool.clone())
        .import_csv(csv_text)
        .await
        .unwrap();

    let orders = OrderService::new(pool)
        .list_orders(&OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(orders[0].qty, 0);
}

#[tokio::test]
async fn import_normalizes_date_columns() {
    let pool = test_pool().await;

    let csv_text = "PO No,PO Date,Invoice Date\nPO-12,5/9/25,not a date\n";
    InterchangeService::new(pool.clone())
        .import_csv(csv_text)
        .await
        .unwrap();

    let orders = OrderService::new(pool)
        .list_orders(&OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(orders[0].po_date, NaiveDate::from_ymd_opt(2025, 9, 5));
    assert_eq!(orders[0].invoice_date, None);
}
