mod common;

use clinic_inventory_api::{
    entities::{
        inbound_movement::InboundType, inventory_item::ItemCategory,
        outbound_movement::OutboundType,
    },
    services::ledger::{CreateInboundRequest, CreateOutboundRequest},
    services::statistics::LowStockMode,
};
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn inbound(item_id: Uuid, quantity: i32) -> CreateInboundRequest {
    CreateInboundRequest {
        item_id,
        quantity,
        movement_type: InboundType::Purchase,
        unit_price: None,
        supplier: None,
        batch_number: None,
        production_date: None,
        expiration_date: None,
        operator: "nurse-1".to_string(),
    }
}

fn outbound(item_id: Uuid, quantity: i32) -> CreateOutboundRequest {
    CreateOutboundRequest {
        item_id,
        quantity,
        movement_type: OutboundType::Use,
        batch_number: None,
        purpose: None,
        patient_ref: None,
        medical_record_ref: None,
        operator: "nurse-1".to_string(),
    }
}

#[tokio::test]
async fn low_stock_modes_select_the_right_items() {
    let app = TestApp::new().await;
    let empty = app.seed_item("EMPTY", 0, 5).await;
    let low = app.seed_item("LOW", 3, 5).await;
    let healthy = app.seed_item("HEALTHY", 10, 5).await;

    let below_safety = app
        .services
        .statistics
        .low_stock(LowStockMode::BelowSafety)
        .await
        .expect("below safety");
    let ids: Vec<_> = below_safety.iter().map(|i| i.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&empty.id));
    assert!(ids.contains(&low.id));
    assert!(!ids.contains(&healthy.id));
    // Emptiest first.
    assert_eq!(below_safety[0].id, empty.id);

    let zero = app
        .services
        .statistics
        .low_stock(LowStockMode::Zero)
        .await
        .expect("zero stock");
    assert_eq!(zero.len(), 1);
    assert_eq!(zero[0].id, empty.id);

    let cutoff = app
        .services
        .statistics
        .low_stock(LowStockMode::Below(3))
        .await
        .expect("cutoff");
    let ids: Vec<_> = cutoff.iter().map(|i| i.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&empty.id));
    assert!(ids.contains(&low.id));
}

#[tokio::test]
async fn type_breakdown_counts_per_category() {
    let app = TestApp::new().await;
    app.seed_item_in_category("M1", 1, 1, ItemCategory::Material).await;
    app.seed_item_in_category("M2", 1, 1, ItemCategory::Material).await;
    app.seed_item_in_category("E1", 1, 1, ItemCategory::Equipment).await;
    let deleted = app
        .seed_item_in_category("GONE", 0, 0, ItemCategory::Equipment)
        .await;
    app.services.catalog.soft_delete_item(deleted.id).await.unwrap();

    let breakdown = app
        .services
        .statistics
        .type_breakdown()
        .await
        .expect("breakdown");

    let count_of = |category: &str| {
        breakdown
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.count)
            .unwrap_or(0)
    };
    assert_eq!(count_of("material"), 2);
    assert_eq!(count_of("equipment"), 1);
}

#[tokio::test]
async fn recent_totals_sum_live_movements_only() {
    let app = TestApp::new().await;
    let item = app.seed_item("MOV", 0, 1).await;

    let first = app.services.ledger.create_inbound(inbound(item.id, 5)).await.unwrap();
    app.services.ledger.create_inbound(inbound(item.id, 3)).await.unwrap();
    app.services.ledger.create_outbound(outbound(item.id, 2)).await.unwrap();

    let totals = app
        .services
        .statistics
        .recent_movement_totals(7)
        .await
        .expect("totals");
    assert_eq!(totals.window_days, 7);
    assert_eq!(totals.inbound_total, 8);
    assert_eq!(totals.outbound_total, 2);

    // Reversed movements drop out of the sums.
    app.services.ledger.delete_inbound(first.id).await.unwrap();
    let totals = app
        .services
        .statistics
        .recent_movement_totals(7)
        .await
        .expect("totals after reversal");
    assert_eq!(totals.inbound_total, 3);
}

#[tokio::test]
async fn totals_over_an_empty_ledger_are_zero() {
    let app = TestApp::new().await;

    let totals = app
        .services
        .statistics
        .recent_movement_totals(30)
        .await
        .expect("totals");
    assert_eq!(totals.inbound_total, 0);
    assert_eq!(totals.outbound_total, 0);
}

#[tokio::test]
async fn summary_reports_counts_and_exact_warning_rate() {
    let app = TestApp::new().await;
    app.seed_item("S1", 0, 5).await;
    app.seed_item("S2", 3, 5).await;
    app.seed_item("S3", 10, 5).await;
    app.seed_item("S4", 20, 5).await;

    let summary = app.services.statistics.summary().await.expect("summary");
    assert_eq!(summary.total_items, 4);
    assert_eq!(summary.low_stock_count, 2);
    assert_eq!(summary.zero_stock_count, 1);
    assert_eq!(summary.warning_rate, dec!(0.5));
}

#[tokio::test]
async fn summary_of_an_empty_catalog_has_zero_rate() {
    let app = TestApp::new().await;

    let summary = app.services.statistics.summary().await.expect("summary");
    assert_eq!(summary.total_items, 0);
    assert_eq!(summary.warning_rate, rust_decimal::Decimal::ZERO);
}
