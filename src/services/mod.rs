// Inventory ledger components
pub mod catalog;
pub mod ledger;
pub mod statistics;
pub mod stock_take;

use crate::{db::DbPool, events::EventSender};
use std::sync::Arc;

/// Bundle of the ledger services over a shared pool and event sender,
/// for dependency injection into the transport layer.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<catalog::InventoryCatalogService>,
    pub ledger: Arc<ledger::LedgerService>,
    pub stock_takes: Arc<stock_take::StockTakeService>,
    pub statistics: Arc<statistics::StatisticsService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            catalog: Arc::new(catalog::InventoryCatalogService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            ledger: Arc::new(ledger::LedgerService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            stock_takes: Arc::new(stock_take::StockTakeService::new(
                db_pool.clone(),
                event_sender,
            )),
            statistics: Arc::new(statistics::StatisticsService::new(db_pool)),
        }
    }
}
