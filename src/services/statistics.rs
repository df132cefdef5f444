use crate::{
    db::DbPool,
    entities::{
        inbound_movement::{self, Entity as InboundMovementEntity},
        inventory_item::{self, Entity as InventoryItemEntity},
        outbound_movement::{self, Entity as OutboundMovementEntity},
    },
    errors::ServiceError,
    services::catalog::ItemResponse,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Threshold mode for the low-stock query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LowStockMode {
    /// current_quantity <= safety_quantity
    BelowSafety,
    /// current_quantity == 0
    Zero,
    /// current_quantity <= the given cutoff
    Below(i32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementTotals {
    pub window_days: u32,
    pub inbound_total: i64,
    pub outbound_total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_items: u64,
    pub low_stock_count: u64,
    pub zero_stock_count: u64,
    /// low_stock_count / total_items, zero when the catalog is empty
    pub warning_rate: Decimal,
}

/// On-demand read queries over the live catalog and ledger state. Nothing
/// here is cached or persisted.
#[derive(Clone)]
pub struct StatisticsService {
    db_pool: Arc<DbPool>,
}

impl StatisticsService {
    /// Creates a new statistics service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists non-deleted items at or under the threshold, emptiest first.
    #[instrument(skip(self))]
    pub async fn low_stock(&self, mode: LowStockMode) -> Result<Vec<ItemResponse>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = InventoryItemEntity::find()
            .filter(inventory_item::Column::DeletedAt.is_null())
            .order_by_asc(inventory_item::Column::CurrentQuantity);

        query = match mode {
            LowStockMode::BelowSafety => query.filter(
                Expr::col(inventory_item::Column::CurrentQuantity)
                    .lte(Expr::col(inventory_item::Column::SafetyQuantity)),
            ),
            LowStockMode::Zero => query.filter(inventory_item::Column::CurrentQuantity.eq(0)),
            LowStockMode::Below(cutoff) => {
                query.filter(inventory_item::Column::CurrentQuantity.lte(cutoff))
            }
        };

        let items = query.all(db).await.map_err(ServiceError::DatabaseError)?;
        Ok(items.into_iter().map(ItemResponse::from).collect())
    }

    /// Item count per category among non-deleted items.
    #[instrument(skip(self))]
    pub async fn type_breakdown(&self) -> Result<Vec<CategoryCount>, ServiceError> {
        let db = &*self.db_pool;

        let rows: Vec<(String, i64)> = InventoryItemEntity::find()
            .select_only()
            .column(inventory_item::Column::Category)
            .column_as(inventory_item::Column::Id.count(), "count")
            .filter(inventory_item::Column::DeletedAt.is_null())
            .group_by(inventory_item::Column::Category)
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(rows
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect())
    }

    /// Sums non-deleted movement quantities over the trailing window.
    #[instrument(skip(self))]
    pub async fn recent_movement_totals(
        &self,
        window_days: u32,
    ) -> Result<MovementTotals, ServiceError> {
        let db = &*self.db_pool;
        let since = Utc::now() - Duration::days(i64::from(window_days));

        let inbound_total: Option<i64> = InboundMovementEntity::find()
            .select_only()
            .column_as(inbound_movement::Column::Quantity.sum(), "total")
            .filter(inbound_movement::Column::DeletedAt.is_null())
            .filter(inbound_movement::Column::CreatedAt.gte(since))
            .into_tuple()
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .flatten();

        let outbound_total: Option<i64> = OutboundMovementEntity::find()
            .select_only()
            .column_as(outbound_movement::Column::Quantity.sum(), "total")
            .filter(outbound_movement::Column::DeletedAt.is_null())
            .filter(outbound_movement::Column::CreatedAt.gte(since))
            .into_tuple()
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .flatten();

        Ok(MovementTotals {
            window_days,
            inbound_total: inbound_total.unwrap_or(0),
            outbound_total: outbound_total.unwrap_or(0),
        })
    }

    /// Overall catalog health: totals and the low-stock warning rate.
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<InventorySummary, ServiceError> {
        let db = &*self.db_pool;

        let total_items = InventoryItemEntity::find()
            .filter(inventory_item::Column::DeletedAt.is_null())
            .count(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let low_stock_count = InventoryItemEntity::find()
            .filter(inventory_item::Column::DeletedAt.is_null())
            .filter(
                Expr::col(inventory_item::Column::CurrentQuantity)
                    .lte(Expr::col(inventory_item::Column::SafetyQuantity)),
            )
            .count(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let zero_stock_count = InventoryItemEntity::find()
            .filter(inventory_item::Column::DeletedAt.is_null())
            .filter(inventory_item::Column::CurrentQuantity.eq(0))
            .count(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let warning_rate = if total_items == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(low_stock_count) / Decimal::from(total_items)
        };

        Ok(InventorySummary {
            total_items,
            low_stock_count,
            zero_stock_count,
            warning_rate,
        })
    }
}
