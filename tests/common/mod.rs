use std::sync::Arc;

use clinic_inventory_api::{
    config::AppConfig,
    db::{self, DbPool},
    entities::inventory_item::ItemCategory,
    events,
    services::{catalog::CreateItemRequest, catalog::ItemResponse, AppServices},
};
use tempfile::TempDir;

/// Test harness backed by a throwaway SQLite database.
///
/// The pool is pinned to a single connection, so concurrent tasks take turns
/// at the database and race-oriented tests resolve deterministically.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("clinic_inventory_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db.clone(), Some(Arc::new(event_sender)));

        Self {
            db,
            services,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    /// Seed a catalog item with the given code and quantities.
    #[allow(dead_code)]
    pub async fn seed_item(&self, code: &str, current: i32, safety: i32) -> ItemResponse {
        self.seed_item_in_category(code, current, safety, ItemCategory::Material)
            .await
    }

    #[allow(dead_code)]
    pub async fn seed_item_in_category(
        &self,
        code: &str,
        current: i32,
        safety: i32,
        category: ItemCategory,
    ) -> ItemResponse {
        self.services
            .catalog
            .create_item(CreateItemRequest {
                code: code.to_string(),
                name: format!("Test item {}", code),
                category,
                specification: None,
                unit: Some("box".to_string()),
                location: None,
                manufacturer: None,
                unit_price: None,
                remarks: None,
                current_quantity: current,
                safety_quantity: safety,
            })
            .await
            .expect("seed catalog item for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
