use crate::{
    db::DbPool,
    entities::{
        inventory_item::{self, Entity as InventoryItemEntity},
        stock_take::{self, Entity as StockTakeEntity, Model as StockTakeModel},
        stock_take_item::{self, Entity as StockTakeItemEntity, Model as StockTakeItemModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    PageParams, PaginatedResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct StockTakeLineRequest {
    pub item_id: Uuid,
    #[validate(range(min = 0, message = "Counted quantity must not be negative"))]
    pub actual_quantity: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateStockTakeRequest {
    pub batch_number: Option<String>,
    pub stock_take_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "Operator is required"))]
    pub operator: String,
    pub remarks: Option<String>,
    #[validate(length(min = 1, message = "At least one counted line is required"))]
    pub lines: Vec<StockTakeLineRequest>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct StockTakeListFilter {
    pub operator: Option<String>,
    pub batch_number: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// Aggregate outcome of a reconciliation batch, stored as JSON text on the
/// `stock_takes` row once the batch settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTakeSummary {
    pub total_count: u64,
    pub mismatch_count: u64,
    pub mismatch_rate: Decimal,
    pub total_absolute_difference: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockTakeResponse {
    pub stock_take: StockTakeModel,
    pub summary: Option<StockTakeSummary>,
    pub lines: Vec<StockTakeItemModel>,
}

/// Batch reconciliation of counted quantities against the live counter.
///
/// Each counted line is applied in its own transaction under a row lock on
/// the item: the `system_quantity` snapshot, the audit row insert and the
/// `current_quantity := actual_quantity` overwrite land together or not at
/// all. The batch as a whole is not one cross-item transaction; a mid-batch
/// failure leaves earlier lines reconciled and reports the failing item.
///
/// Deleting a stock-take tombstones its rows but never reverts quantities.
/// Reconciliation is a historical fact once applied; callers must not expect
/// the symmetry that ledger-movement deletion has.
#[derive(Clone)]
pub struct StockTakeService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl StockTakeService {
    /// Creates a new stock-take service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Applies a reconciliation batch.
    ///
    /// Every referenced item is resolved before any mutation; a missing or
    /// soft-deleted id fails the whole batch with `NotFound` and no state
    /// change. After that, lines are applied one by one, fail-fast: on error
    /// the summary is finalized over the applied lines and the returned
    /// `Conflict` names the failing item and the applied count.
    #[instrument(skip(self, request), fields(operator = %request.operator, lines = request.lines.len()))]
    pub async fn create_stock_take(
        &self,
        request: CreateStockTakeRequest,
    ) -> Result<StockTakeResponse, ServiceError> {
        request.validate()?;
        for line in &request.lines {
            line.validate()?;
        }
        let mut seen = HashSet::new();
        for line in &request.lines {
            if !seen.insert(line.item_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Item {} is counted more than once in the batch",
                    line.item_id
                )));
            }
        }

        let db = &*self.db_pool;
        self.resolve_all_items(db, &request.lines).await?;

        self.apply_batch(request).await
    }

    /// Second phase of `create_stock_take`: header insert, per-line
    /// application, summary finalization and failure reporting. Items were
    /// resolved by the caller but can still vanish before their line lands.
    async fn apply_batch(
        &self,
        request: CreateStockTakeRequest,
    ) -> Result<StockTakeResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();
        let stock_take_id = Uuid::new_v4();

        let header = stock_take::ActiveModel {
            id: Set(stock_take_id),
            batch_number: Set(request.batch_number),
            stock_take_date: Set(request.stock_take_date),
            operator: Set(request.operator),
            remarks: Set(request.remarks),
            result_summary: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        };
        let header = header.insert(db).await.map_err(|e| {
            error!(error = %e, stock_take_id = %stock_take_id, "Failed to insert stock take header");
            ServiceError::DatabaseError(e)
        })?;

        let mut applied: Vec<StockTakeItemModel> = Vec::with_capacity(request.lines.len());
        let mut failure: Option<ServiceError> = None;

        for (index, line) in request.lines.iter().enumerate() {
            match self
                .apply_line(stock_take_id, index as i32 + 1, line)
                .await
            {
                Ok(model) => applied.push(model),
                Err(e) => {
                    warn!(
                        stock_take_id = %stock_take_id,
                        item_id = %line.item_id,
                        line = index + 1,
                        error = %e,
                        "Stock take line failed, stopping batch"
                    );
                    failure = Some(e);
                    break;
                }
            }
        }

        let summary = summarize(&applied);
        let summary_json = serde_json::to_string(&summary).map_err(|e| {
            ServiceError::InternalError(format!("Failed to serialize stock take summary: {}", e))
        })?;

        let mut header_active: stock_take::ActiveModel = header.into();
        header_active.result_summary = Set(Some(summary_json));
        header_active.updated_at = Set(Some(Utc::now()));
        let header = header_active
            .update(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if let Some(cause) = failure {
            let failed_line = applied.len() + 1;
            let failed_item = request.lines[applied.len()].item_id;
            return Err(ServiceError::Conflict(format!(
                "Stock take {}: line {} (item {}) failed after {} of {} lines were applied: {}",
                stock_take_id,
                failed_line,
                failed_item,
                applied.len(),
                request.lines.len(),
                cause
            )));
        }

        info!(
            stock_take_id = %stock_take_id,
            total_count = summary.total_count,
            mismatch_count = summary.mismatch_count,
            "Stock take applied"
        );

        self.emit(Event::StockTakeApplied {
            stock_take_id,
            total_count: summary.total_count,
            mismatch_count: summary.mismatch_count,
        })
        .await;

        Ok(StockTakeResponse {
            stock_take: header,
            summary: Some(summary),
            lines: applied,
        })
    }

    /// Retrieves a non-deleted stock-take with its lines in input order.
    #[instrument(skip(self), fields(stock_take_id = %stock_take_id))]
    pub async fn get_stock_take(
        &self,
        stock_take_id: Uuid,
    ) -> Result<StockTakeResponse, ServiceError> {
        let db = &*self.db_pool;

        let header = StockTakeEntity::find_by_id(stock_take_id)
            .filter(stock_take::Column::DeletedAt.is_null())
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Stock take {} not found", stock_take_id))
            })?;

        let lines = StockTakeItemEntity::find()
            .filter(stock_take_item::Column::StockTakeId.eq(stock_take_id))
            .filter(stock_take_item::Column::DeletedAt.is_null())
            .order_by_asc(stock_take_item::Column::LineNumber)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let summary = parse_summary(header.result_summary.as_deref());

        Ok(StockTakeResponse {
            stock_take: header,
            summary,
            lines,
        })
    }

    /// Lists non-deleted stock-take headers, newest first.
    #[instrument(skip(self, filter))]
    pub async fn list_stock_takes(
        &self,
        filter: StockTakeListFilter,
        page: PageParams,
    ) -> Result<PaginatedResponse<StockTakeModel>, ServiceError> {
        let db = &*self.db_pool;
        let page = page.normalize();

        let mut query = StockTakeEntity::find()
            .filter(stock_take::Column::DeletedAt.is_null())
            .order_by_desc(stock_take::Column::CreatedAt);

        if let Some(operator) = filter.operator {
            query = query.filter(stock_take::Column::Operator.eq(operator));
        }
        if let Some(batch_number) = filter.batch_number {
            query = query.filter(stock_take::Column::BatchNumber.eq(batch_number));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(stock_take::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(stock_take::Column::CreatedAt.lte(to));
        }

        let paginator = query.paginate(db, page.page_size);
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let items = paginator
            .fetch_page(page.page - 1)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(PaginatedResponse::new(items, total, page))
    }

    /// Soft-deletes a stock-take and its lines. Item quantities are left as
    /// the reconciliation set them; there is no reversal.
    #[instrument(skip(self), fields(stock_take_id = %stock_take_id))]
    pub async fn delete_stock_take(
        &self,
        stock_take_id: Uuid,
    ) -> Result<StockTakeModel, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let header = StockTakeEntity::find_by_id(stock_take_id)
            .filter(stock_take::Column::DeletedAt.is_null())
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Stock take {} not found", stock_take_id))
            })?;

        StockTakeItemEntity::update_many()
            .col_expr(
                stock_take_item::Column::DeletedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(stock_take_item::Column::StockTakeId.eq(stock_take_id))
            .filter(stock_take_item::Column::DeletedAt.is_null())
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut header_active: stock_take::ActiveModel = header.into();
        header_active.deleted_at = Set(Some(now));
        header_active.updated_at = Set(Some(now));
        let deleted = header_active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(stock_take_id = %stock_take_id, "Stock take deleted, quantities untouched");

        self.emit(Event::StockTakeDeleted(stock_take_id)).await;

        Ok(deleted)
    }

    /// Applies one counted line: snapshot, audit row and overwrite in one
    /// transaction under a row lock on the item.
    async fn apply_line(
        &self,
        stock_take_id: Uuid,
        line_number: i32,
        line: &StockTakeLineRequest,
    ) -> Result<StockTakeItemModel, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let item = self.lock_item(&txn, line.item_id).await?;

        let system_quantity = item.current_quantity;
        let difference = line.actual_quantity - system_quantity;

        let audit = stock_take_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            stock_take_id: Set(stock_take_id),
            item_id: Set(line.item_id),
            line_number: Set(line_number),
            system_quantity: Set(system_quantity),
            actual_quantity: Set(line.actual_quantity),
            difference: Set(difference),
            reason: Set(line.reason.clone()),
            created_at: Set(now),
            deleted_at: Set(None),
        };
        let model = audit
            .insert(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut item_active: inventory_item::ActiveModel = item.into();
        item_active.current_quantity = Set(line.actual_quantity);
        item_active.updated_at = Set(Some(now));
        item_active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        Ok(model)
    }

    /// Resolves every referenced item before any mutation. Missing or
    /// soft-deleted ids fail the batch up front, listed in one error.
    async fn resolve_all_items(
        &self,
        db: &DbPool,
        lines: &[StockTakeLineRequest],
    ) -> Result<(), ServiceError> {
        let ids: Vec<Uuid> = lines.iter().map(|l| l.item_id).collect();

        let found: Vec<Uuid> = InventoryItemEntity::find()
            .select_only()
            .column(inventory_item::Column::Id)
            .filter(inventory_item::Column::Id.is_in(ids.clone()))
            .filter(inventory_item::Column::DeletedAt.is_null())
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let found: HashSet<Uuid> = found.into_iter().collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(id))
            .map(|id| id.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!(
                "Inventory items not found: {}",
                missing.join(", ")
            )))
        }
    }

    /// Row-locks a non-deleted item for a line application. An item resolved
    /// up front can still disappear before its line is reached.
    async fn lock_item(
        &self,
        txn: &DatabaseTransaction,
        item_id: Uuid,
    ) -> Result<inventory_item::Model, ServiceError> {
        InventoryItemEntity::find_by_id(item_id)
            .filter(inventory_item::Column::DeletedAt.is_null())
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", item_id)))
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send stock take event");
            }
        }
    }
}

fn summarize(lines: &[StockTakeItemModel]) -> StockTakeSummary {
    let total_count = lines.len() as u64;
    let mismatch_count = lines.iter().filter(|l| l.difference != 0).count() as u64;
    let total_absolute_difference = lines
        .iter()
        .map(|l| i64::from(l.difference.unsigned_abs()))
        .sum();
    let mismatch_rate = if total_count == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(mismatch_count) / Decimal::from(total_count)
    };

    StockTakeSummary {
        total_count,
        mismatch_count,
        mismatch_rate,
        total_absolute_difference,
    }
}

fn parse_summary(raw: Option<&str>) -> Option<StockTakeSummary> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!(error = %e, "Unparseable stock take summary");
            None
        }
    }
}
