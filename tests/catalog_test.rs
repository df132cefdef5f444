mod common;

use assert_matches::assert_matches;
use clinic_inventory_api::{
    entities::inventory_item::{ItemCategory, ItemStatus},
    errors::ServiceError,
    services::catalog::{CreateItemRequest, ItemListFilter, UpdateItemRequest},
    services::ledger::CreateInboundRequest,
    PageParams,
};
use common::TestApp;
use rust_decimal_macros::dec;

fn request(code: &str) -> CreateItemRequest {
    CreateItemRequest {
        code: code.to_string(),
        name: format!("Item {}", code),
        category: ItemCategory::Medicine,
        specification: Some("500mg x 20".to_string()),
        unit: Some("box".to_string()),
        location: Some("cabinet B2".to_string()),
        manufacturer: None,
        unit_price: Some(dec!(4.25)),
        remarks: None,
        current_quantity: 8,
        safety_quantity: 3,
    }
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let app = TestApp::new().await;

    let created = app
        .services
        .catalog
        .create_item(request("AMOX-500"))
        .await
        .expect("create item");

    assert_eq!(created.code, "AMOX-500");
    assert_eq!(created.category, ItemCategory::Medicine);
    assert_eq!(created.status, ItemStatus::Active);
    assert_eq!(created.unit_price, Some(dec!(4.25)));
    assert_eq!(created.current_quantity, 8);
    assert!(created.deleted_at.is_none());

    let fetched = app
        .services
        .catalog
        .get_item(created.id)
        .await
        .expect("get item");
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.code, created.code);
}

#[tokio::test]
async fn duplicate_code_is_rejected_until_holder_is_deleted() {
    let app = TestApp::new().await;

    let first = app
        .services
        .catalog
        .create_item(request("X1"))
        .await
        .expect("first create");

    let err = app
        .services
        .catalog
        .create_item(request("X1"))
        .await
        .expect_err("second create must fail");
    assert_matches!(err, ServiceError::ValidationError(_));

    app.services
        .catalog
        .soft_delete_item(first.id)
        .await
        .expect("delete holder");

    // Code becomes reusable once the holder is tombstoned.
    app.services
        .catalog
        .create_item(request("X1"))
        .await
        .expect("recreate with freed code");
}

#[tokio::test]
async fn concurrent_creates_with_one_code_keep_it_unique() {
    let app = TestApp::new().await;

    for round in 0..5 {
        let code = format!("DUP-{}", round);

        let mut tasks = vec![];
        for _ in 0..2 {
            let catalog = app.services.catalog.clone();
            let code = code.clone();
            tasks.push(tokio::spawn(
                async move { catalog.create_item(request(&code)).await },
            ));
        }

        let mut successes = 0;
        for task in tasks {
            match task.await.expect("task panicked") {
                Ok(_) => successes += 1,
                Err(ServiceError::ValidationError(_)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(successes, 1, "code {} must be created exactly once", code);

        let listed = app
            .services
            .catalog
            .list_items(
                ItemListFilter {
                    keyword: Some(code.clone()),
                    ..Default::default()
                },
                PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(listed.total, 1, "a single row holds code {}", code);
    }
}

#[tokio::test]
async fn update_patches_fields_and_guards_code_uniqueness() {
    let app = TestApp::new().await;

    let a = app.services.catalog.create_item(request("A1")).await.unwrap();
    let _b = app.services.catalog.create_item(request("B1")).await.unwrap();

    let err = app
        .services
        .catalog
        .update_item(
            a.id,
            UpdateItemRequest {
                code: Some("B1".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect_err("code collision must fail");
    assert_matches!(err, ServiceError::ValidationError(_));

    let updated = app
        .services
        .catalog
        .update_item(
            a.id,
            UpdateItemRequest {
                name: Some("Renamed".to_string()),
                safety_quantity: Some(9),
                status: Some(ItemStatus::Inactive),
                ..Default::default()
            },
        )
        .await
        .expect("patch update");

    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.safety_quantity, 9);
    assert_eq!(updated.status, ItemStatus::Inactive);
    // Untouched fields survive the patch.
    assert_eq!(updated.code, "A1");
    assert_eq!(updated.current_quantity, 8);
}

#[tokio::test]
async fn soft_delete_is_blocked_by_movement_history() {
    let app = TestApp::new().await;
    let item = app.seed_item("GAUZE", 0, 2).await;

    let movement = app
        .services
        .ledger
        .create_inbound(CreateInboundRequest {
            item_id: item.id,
            quantity: 5,
            movement_type: clinic_inventory_api::entities::inbound_movement::InboundType::Purchase,
            unit_price: None,
            supplier: None,
            batch_number: None,
            production_date: None,
            expiration_date: None,
            operator: "nurse-1".to_string(),
        })
        .await
        .expect("record inbound");

    let err = app
        .services
        .catalog
        .soft_delete_item(item.id)
        .await
        .expect_err("delete with history must fail");
    assert_matches!(err, ServiceError::Conflict(_));

    // Reversing the movement unblocks deletion.
    app.services
        .ledger
        .delete_inbound(movement.id)
        .await
        .expect("reverse inbound");

    let deleted = app
        .services
        .catalog
        .soft_delete_item(item.id)
        .await
        .expect("delete after reversal");
    assert!(deleted.deleted_at.is_some());

    // Tombstoned items stay addressable by id but leave the default list.
    let fetched = app.services.catalog.get_item(item.id).await.expect("get tombstone");
    assert!(fetched.deleted_at.is_some());

    let listed = app
        .services
        .catalog
        .list_items(ItemListFilter::default(), PageParams::default())
        .await
        .expect("list items");
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn list_supports_keyword_category_and_low_stock_filters() {
    let app = TestApp::new().await;

    app.seed_item_in_category("GLOVE-M", 10, 5, ItemCategory::Material)
        .await;
    app.seed_item_in_category("MASK-S", 2, 5, ItemCategory::Material)
        .await;
    app.seed_item_in_category("THERMO", 1, 1, ItemCategory::Equipment)
        .await;

    let by_keyword = app
        .services
        .catalog
        .list_items(
            ItemListFilter {
                keyword: Some("GLOVE".to_string()),
                ..Default::default()
            },
            PageParams::default(),
        )
        .await
        .expect("keyword filter");
    assert_eq!(by_keyword.total, 1);
    assert_eq!(by_keyword.items[0].code, "GLOVE-M");

    let by_category = app
        .services
        .catalog
        .list_items(
            ItemListFilter {
                category: Some(ItemCategory::Equipment),
                ..Default::default()
            },
            PageParams::default(),
        )
        .await
        .expect("category filter");
    assert_eq!(by_category.total, 1);
    assert_eq!(by_category.items[0].code, "THERMO");

    let low_stock = app
        .services
        .catalog
        .list_items(
            ItemListFilter {
                low_stock_only: true,
                ..Default::default()
            },
            PageParams::default(),
        )
        .await
        .expect("low stock filter");
    let codes: Vec<_> = low_stock.items.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(low_stock.total, 2);
    assert!(codes.contains(&"MASK-S"));
    assert!(codes.contains(&"THERMO"));
}

#[tokio::test]
async fn list_pagination_reports_full_total() {
    let app = TestApp::new().await;
    for i in 0..5 {
        app.seed_item(&format!("PAGE-{}", i), 1, 1).await;
    }

    let page = app
        .services
        .catalog
        .list_items(
            ItemListFilter::default(),
            PageParams {
                page: 2,
                page_size: 2,
            },
        )
        .await
        .expect("paged list");

    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 2);
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let app = TestApp::new().await;

    let mut negative_quantity = request("NEG-1");
    negative_quantity.current_quantity = -1;
    let err = app
        .services
        .catalog
        .create_item(negative_quantity)
        .await
        .expect_err("negative quantity");
    assert_matches!(err, ServiceError::ValidationError(_));

    let mut negative_price = request("NEG-2");
    negative_price.unit_price = Some(dec!(-1));
    let err = app
        .services
        .catalog
        .create_item(negative_price)
        .await
        .expect_err("negative price");
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = app
        .services
        .catalog
        .get_item(uuid::Uuid::new_v4())
        .await
        .expect_err("unknown id");
    assert_matches!(err, ServiceError::NotFound(_));
}
