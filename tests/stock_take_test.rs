mod common;

use assert_matches::assert_matches;
use clinic_inventory_api::{
    errors::ServiceError,
    services::stock_take::{
        CreateStockTakeRequest, StockTakeLineRequest, StockTakeListFilter,
    },
    PageParams,
};
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn batch(lines: Vec<StockTakeLineRequest>) -> CreateStockTakeRequest {
    CreateStockTakeRequest {
        batch_number: Some("ST-2024-001".to_string()),
        stock_take_date: None,
        operator: "nurse-1".to_string(),
        remarks: None,
        lines,
    }
}

fn line(item_id: Uuid, actual_quantity: i32) -> StockTakeLineRequest {
    StockTakeLineRequest {
        item_id,
        actual_quantity,
        reason: None,
    }
}

#[tokio::test]
async fn reconciliation_captures_snapshot_and_overwrites_quantity() {
    let app = TestApp::new().await;
    let item = app.seed_item("GAUZE", 42, 5).await;

    let response = app
        .services
        .stock_takes
        .create_stock_take(batch(vec![line(item.id, 37)]))
        .await
        .expect("apply stock take");

    assert_eq!(response.lines.len(), 1);
    let applied = &response.lines[0];
    assert_eq!(applied.system_quantity, 42);
    assert_eq!(applied.actual_quantity, 37);
    assert_eq!(applied.difference, -5);

    let summary = response.summary.expect("summary present");
    assert_eq!(summary.total_count, 1);
    assert_eq!(summary.mismatch_count, 1);
    assert_eq!(summary.mismatch_rate, dec!(1));
    assert_eq!(summary.total_absolute_difference, 5);

    let item = app.services.catalog.get_item(item.id).await.unwrap();
    assert_eq!(item.current_quantity, 37);
}

#[tokio::test]
async fn only_differing_lines_count_as_mismatches() {
    let app = TestApp::new().await;
    let a = app.seed_item("A", 10, 1).await;
    let b = app.seed_item("B", 4, 1).await;

    let response = app
        .services
        .stock_takes
        .create_stock_take(batch(vec![line(a.id, 10), line(b.id, 7)]))
        .await
        .expect("apply stock take");

    let summary = response.summary.unwrap();
    assert_eq!(summary.total_count, 2);
    assert_eq!(summary.mismatch_count, 1);
    assert_eq!(summary.mismatch_rate, dec!(0.5));
    assert_eq!(summary.total_absolute_difference, 3);

    // Lines keep their input order.
    assert_eq!(response.lines[0].item_id, a.id);
    assert_eq!(response.lines[0].line_number, 1);
    assert_eq!(response.lines[1].item_id, b.id);
    assert_eq!(response.lines[1].line_number, 2);
}

#[tokio::test]
async fn missing_items_fail_the_batch_before_any_mutation() {
    let app = TestApp::new().await;
    let item = app.seed_item("REAL", 8, 1).await;
    let ghost = Uuid::new_v4();

    let err = app
        .services
        .stock_takes
        .create_stock_take(batch(vec![line(item.id, 5), line(ghost, 1)]))
        .await
        .expect_err("ghost item must fail the batch");

    match err {
        ServiceError::NotFound(msg) => assert!(msg.contains(&ghost.to_string())),
        other => panic!("unexpected error: {}", other),
    }

    // Nothing was applied, nothing was recorded.
    let item = app.services.catalog.get_item(item.id).await.unwrap();
    assert_eq!(item.current_quantity, 8);

    let listed = app
        .services
        .stock_takes
        .list_stock_takes(StockTakeListFilter::default(), PageParams::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn duplicate_items_in_one_batch_are_rejected() {
    let app = TestApp::new().await;
    let item = app.seed_item("DUP", 8, 1).await;

    let err = app
        .services
        .stock_takes
        .create_stock_take(batch(vec![line(item.id, 5), line(item.id, 6)]))
        .await
        .expect_err("duplicate line");
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn empty_batches_are_rejected() {
    let app = TestApp::new().await;

    let err = app
        .services
        .stock_takes
        .create_stock_take(batch(vec![]))
        .await
        .expect_err("empty batch");
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn get_returns_header_lines_and_parsed_summary() {
    let app = TestApp::new().await;
    let a = app.seed_item("GA", 3, 1).await;
    let b = app.seed_item("GB", 9, 1).await;

    let created = app
        .services
        .stock_takes
        .create_stock_take(batch(vec![line(a.id, 3), line(b.id, 2)]))
        .await
        .unwrap();

    let fetched = app
        .services
        .stock_takes
        .get_stock_take(created.stock_take.id)
        .await
        .expect("get stock take");

    assert_eq!(fetched.stock_take.id, created.stock_take.id);
    assert_eq!(fetched.stock_take.operator, "nurse-1");
    assert_eq!(fetched.lines.len(), 2);
    assert_eq!(fetched.lines[0].line_number, 1);
    assert_eq!(fetched.summary, created.summary);
}

#[tokio::test]
async fn list_filters_by_operator_and_batch_number() {
    let app = TestApp::new().await;
    let item = app.seed_item("LST", 5, 1).await;

    app.services
        .stock_takes
        .create_stock_take(batch(vec![line(item.id, 5)]))
        .await
        .unwrap();

    let by_operator = app
        .services
        .stock_takes
        .list_stock_takes(
            StockTakeListFilter {
                operator: Some("nurse-1".to_string()),
                ..Default::default()
            },
            PageParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_operator.total, 1);

    let by_other_operator = app
        .services
        .stock_takes
        .list_stock_takes(
            StockTakeListFilter {
                operator: Some("nurse-2".to_string()),
                ..Default::default()
            },
            PageParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_other_operator.total, 0);
}

#[tokio::test]
async fn deleting_a_stock_take_leaves_quantities_as_reconciled() {
    let app = TestApp::new().await;
    let item = app.seed_item("DEL", 42, 5).await;

    let created = app
        .services
        .stock_takes
        .create_stock_take(batch(vec![line(item.id, 37)]))
        .await
        .unwrap();

    let deleted = app
        .services
        .stock_takes
        .delete_stock_take(created.stock_take.id)
        .await
        .expect("delete stock take");
    assert!(deleted.deleted_at.is_some());

    // The overwrite is a historical fact; deletion does not revert it.
    let item = app.services.catalog.get_item(item.id).await.unwrap();
    assert_eq!(item.current_quantity, 37);

    let err = app
        .services
        .stock_takes
        .get_stock_take(created.stock_take.id)
        .await
        .expect_err("tombstoned stock take");
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn negative_counted_quantities_are_rejected() {
    let app = TestApp::new().await;
    let item = app.seed_item("NEG", 5, 1).await;

    let err = app
        .services
        .stock_takes
        .create_stock_take(batch(vec![line(item.id, -1)]))
        .await
        .expect_err("negative count");
    assert_matches!(err, ServiceError::ValidationError(_));

    let item = app.services.catalog.get_item(item.id).await.unwrap();
    assert_eq!(item.current_quantity, 5);
}
