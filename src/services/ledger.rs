use crate::{
    db::DbPool,
    entities::{
        inbound_movement::{
            self, Entity as InboundMovementEntity, InboundType, Model as InboundMovementModel,
        },
        inventory_item::{self, Entity as InventoryItemEntity},
        outbound_movement::{
            self, Entity as OutboundMovementEntity, Model as OutboundMovementModel, OutboundType,
        },
    },
    errors::ServiceError,
    events::{Event, EventSender},
    PageParams, PaginatedResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Request/Response types for the ledger service
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateInboundRequest {
    pub item_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub movement_type: InboundType,
    pub unit_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub batch_number: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "Operator is required"))]
    pub operator: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOutboundRequest {
    pub item_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub movement_type: OutboundType,
    pub batch_number: Option<String>,
    pub purpose: Option<String>,
    pub patient_ref: Option<String>,
    pub medical_record_ref: Option<String>,
    #[validate(length(min = 1, message = "Operator is required"))]
    pub operator: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct InboundListFilter {
    pub item_id: Option<Uuid>,
    pub movement_type: Option<InboundType>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct OutboundListFilter {
    pub item_id: Option<Uuid>,
    pub movement_type: Option<OutboundType>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

pub type InboundMovementResponse = InboundMovementModel;
pub type OutboundMovementResponse = OutboundMovementModel;

/// Append-only ledger of inbound/outbound movements.
///
/// Every read-modify-write of an item's `current_quantity` happens as one
/// indivisible unit scoped to that item's row: creations fold the check into
/// a single conditional UPDATE, deletions take a row lock for the reversal.
/// Operations on different items proceed fully in parallel.
#[derive(Clone)]
pub struct LedgerService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl LedgerService {
    /// Creates a new ledger service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records an inbound movement and increments the item's quantity in the
    /// same transaction. `total_price` is derived as quantity * unit_price
    /// whenever a unit price is supplied.
    #[instrument(skip(self, request), fields(item_id = %request.item_id, quantity = request.quantity))]
    pub async fn create_inbound(
        &self,
        request: CreateInboundRequest,
    ) -> Result<InboundMovementResponse, ServiceError> {
        request.validate()?;
        validate_optional_price(request.unit_price)?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let movement_id = Uuid::new_v4();
        let total_price = request
            .unit_price
            .map(|price| price * Decimal::from(request.quantity));

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        self.resolve_item(&txn, request.item_id).await?;

        let movement = inbound_movement::ActiveModel {
            id: Set(movement_id),
            item_id: Set(request.item_id),
            quantity: Set(request.quantity),
            movement_type: Set(request.movement_type.to_string()),
            unit_price: Set(request.unit_price),
            total_price: Set(total_price),
            supplier: Set(request.supplier),
            batch_number: Set(request.batch_number),
            production_date: Set(request.production_date),
            expiration_date: Set(request.expiration_date),
            operator: Set(request.operator),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        };

        let model = movement.insert(&txn).await.map_err(|e| {
            error!(error = %e, movement_id = %movement_id, "Failed to insert inbound movement");
            ServiceError::DatabaseError(e)
        })?;

        let update = InventoryItemEntity::update_many()
            .col_expr(
                inventory_item::Column::CurrentQuantity,
                Expr::col(inventory_item::Column::CurrentQuantity).add(request.quantity),
            )
            .col_expr(inventory_item::Column::UpdatedAt, Expr::value(now))
            .filter(inventory_item::Column::Id.eq(request.item_id))
            .filter(inventory_item::Column::DeletedAt.is_null())
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, item_id = %request.item_id, "Failed to increment item quantity");
                ServiceError::DatabaseError(e)
            })?;

        if update.rows_affected == 0 {
            // The item passed resolution above but vanished before the
            // increment landed.
            return Err(ServiceError::Conflict(format!(
                "Inventory item {} was deleted concurrently",
                request.item_id
            )));
        }

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            movement_id = %movement_id,
            item_id = %request.item_id,
            quantity = request.quantity,
            "Inbound movement recorded"
        );

        self.emit(Event::InboundRecorded {
            movement_id,
            item_id: request.item_id,
            quantity: request.quantity,
        })
        .await;

        Ok(model)
    }

    /// Records an outbound movement. The stock check and the decrement are a
    /// single conditional UPDATE, so two concurrent outbounds can never drive
    /// the quantity negative; the loser observes `InsufficientStock`.
    #[instrument(skip(self, request), fields(item_id = %request.item_id, quantity = request.quantity))]
    pub async fn create_outbound(
        &self,
        request: CreateOutboundRequest,
    ) -> Result<OutboundMovementResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let movement_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        self.resolve_item(&txn, request.item_id).await?;

        let update = InventoryItemEntity::update_many()
            .col_expr(
                inventory_item::Column::CurrentQuantity,
                Expr::col(inventory_item::Column::CurrentQuantity).sub(request.quantity),
            )
            .col_expr(inventory_item::Column::UpdatedAt, Expr::value(now))
            .filter(inventory_item::Column::Id.eq(request.item_id))
            .filter(inventory_item::Column::DeletedAt.is_null())
            .filter(inventory_item::Column::CurrentQuantity.gte(request.quantity))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, item_id = %request.item_id, "Failed to decrement item quantity");
                ServiceError::DatabaseError(e)
            })?;

        if update.rows_affected == 0 {
            // Advisory read for the error message; the authoritative check
            // was the conditional UPDATE itself.
            let available = self.resolve_item(&txn, request.item_id).await?.current_quantity;
            warn!(
                item_id = %request.item_id,
                requested = request.quantity,
                available,
                "Outbound rejected for insufficient stock"
            );
            return Err(ServiceError::insufficient_stock(
                request.item_id,
                request.quantity,
                available,
            ));
        }

        let movement = outbound_movement::ActiveModel {
            id: Set(movement_id),
            item_id: Set(request.item_id),
            quantity: Set(request.quantity),
            movement_type: Set(request.movement_type.to_string()),
            batch_number: Set(request.batch_number),
            purpose: Set(request.purpose),
            patient_ref: Set(request.patient_ref),
            medical_record_ref: Set(request.medical_record_ref),
            operator: Set(request.operator),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        };

        let model = movement.insert(&txn).await.map_err(|e| {
            error!(error = %e, movement_id = %movement_id, "Failed to insert outbound movement");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            movement_id = %movement_id,
            item_id = %request.item_id,
            quantity = request.quantity,
            "Outbound movement recorded"
        );

        self.emit(Event::OutboundRecorded {
            movement_id,
            item_id: request.item_id,
            quantity: request.quantity,
        })
        .await;

        Ok(model)
    }

    /// Retrieves a non-deleted inbound movement by id.
    #[instrument(skip(self), fields(movement_id = %movement_id))]
    pub async fn get_inbound(
        &self,
        movement_id: Uuid,
    ) -> Result<InboundMovementResponse, ServiceError> {
        let db = &*self.db_pool;

        InboundMovementEntity::find_by_id(movement_id)
            .filter(inbound_movement::Column::DeletedAt.is_null())
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inbound movement {} not found", movement_id))
            })
    }

    /// Retrieves a non-deleted outbound movement by id.
    #[instrument(skip(self), fields(movement_id = %movement_id))]
    pub async fn get_outbound(
        &self,
        movement_id: Uuid,
    ) -> Result<OutboundMovementResponse, ServiceError> {
        let db = &*self.db_pool;

        OutboundMovementEntity::find_by_id(movement_id)
            .filter(outbound_movement::Column::DeletedAt.is_null())
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Outbound movement {} not found", movement_id))
            })
    }

    /// Lists non-deleted inbound movements, newest first.
    #[instrument(skip(self, filter))]
    pub async fn list_inbound(
        &self,
        filter: InboundListFilter,
        page: PageParams,
    ) -> Result<PaginatedResponse<InboundMovementResponse>, ServiceError> {
        let db = &*self.db_pool;
        let page = page.normalize();

        let mut query = InboundMovementEntity::find()
            .filter(inbound_movement::Column::DeletedAt.is_null())
            .order_by_desc(inbound_movement::Column::CreatedAt);

        if let Some(item_id) = filter.item_id {
            query = query.filter(inbound_movement::Column::ItemId.eq(item_id));
        }
        if let Some(movement_type) = filter.movement_type {
            query =
                query.filter(inbound_movement::Column::MovementType.eq(movement_type.to_string()));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(inbound_movement::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(inbound_movement::Column::CreatedAt.lte(to));
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

    /// Lists non-deleted outbound movements, newest first.
    #[instrument(skip(self, filter))]
    pub async fn list_outbound(
        &self,
        filter: OutboundListFilter,
        page: PageParams,
    ) -> Result<PaginatedResponse<OutboundMovementResponse>, ServiceError> {
        let db = &*self.db_pool;
        let page = page.normalize();

        let mut query = OutboundMovementEntity::find()
            .filter(outbound_movement::Column::DeletedAt.is_null())
            .order_by_desc(outbound_movement::Column::CreatedAt);

        if let Some(item_id) = filter.item_id {
            query = query.filter(outbound_movement::Column::ItemId.eq(item_id));
        }
        if let Some(movement_type) = filter.movement_type {
            query =
                query.filter(outbound_movement::Column::MovementType.eq(movement_type.to_string()));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(outbound_movement::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(outbound_movement::Column::CreatedAt.lte(to));
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

    /// Soft-deletes an inbound movement and subtracts its quantity again,
    /// clamped at zero. The clamp makes reversal lossy when intervening
    /// outbound movements already consumed part of the inbound stock; the
    /// event reports whether clamping occurred.
    #[instrument(skip(self), fields(movement_id = %movement_id))]
    pub async fn delete_inbound(
        &self,
        movement_id: Uuid,
    ) -> Result<InboundMovementResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let movement = InboundMovementEntity::find_by_id(movement_id)
            .filter(inbound_movement::Column::DeletedAt.is_null())
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inbound movement {} not found", movement_id))
            })?;

        let item = self.lock_item(&txn, movement.item_id).await?;

        let reversed = item.current_quantity - movement.quantity;
        let clamped = reversed < 0;
        let new_quantity = reversed.max(0);
        if clamped {
            warn!(
                movement_id = %movement_id,
                item_id = %item.id,
                current = item.current_quantity,
                reversal = movement.quantity,
                "Inbound reversal clamped at zero"
            );
        }

        let item_id = item.id;
        let mut item_active: inventory_item::ActiveModel = item.into();
        item_active.current_quantity = Set(new_quantity);
        item_active.updated_at = Set(Some(now));
        item_active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let quantity = movement.quantity;
        let mut movement_active: inbound_movement::ActiveModel = movement.into();
        movement_active.deleted_at = Set(Some(now));
        movement_active.updated_at = Set(Some(now));
        let deleted = movement_active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(movement_id = %movement_id, item_id = %item_id, "Inbound movement reversed");

        self.emit(Event::InboundReversed {
            movement_id,
            item_id,
            quantity,
            clamped,
        })
        .await;

        Ok(deleted)
    }

    /// Soft-deletes an outbound movement and restores its quantity
    /// unconditionally.
    #[instrument(skip(self), fields(movement_id = %movement_id))]
    pub async fn delete_outbound(
        &self,
        movement_id: Uuid,
    ) -> Result<OutboundMovementResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let movement = OutboundMovementEntity::find_by_id(movement_id)
            .filter(outbound_movement::Column::DeletedAt.is_null())
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Outbound movement {} not found", movement_id))
            })?;

        let item = self.lock_item(&txn, movement.item_id).await?;

        let item_id = item.id;
        let new_quantity = item.current_quantity + movement.quantity;
        let mut item_active: inventory_item::ActiveModel = item.into();
        item_active.current_quantity = Set(new_quantity);
        item_active.updated_at = Set(Some(now));
        item_active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let quantity = movement.quantity;
        let mut movement_active: outbound_movement::ActiveModel = movement.into();
        movement_active.deleted_at = Set(Some(now));
        movement_active.updated_at = Set(Some(now));
        let deleted = movement_active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(movement_id = %movement_id, item_id = %item_id, "Outbound movement reversed");

        self.emit(Event::OutboundReversed {
            movement_id,
            item_id,
            quantity,
        })
        .await;

        Ok(deleted)
    }

    /// Resolves a non-deleted item inside the caller's transaction.
    async fn resolve_item(
        &self,
        txn: &DatabaseTransaction,
        item_id: Uuid,
    ) -> Result<inventory_item::Model, ServiceError> {
        InventoryItemEntity::find_by_id(item_id)
            .filter(inventory_item::Column::DeletedAt.is_null())
            .one(txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", item_id)))
    }

    /// Row-locks an item for a reversal. The item must exist: soft deletion
    /// is refused while any non-deleted movement references it.
    async fn lock_item(
        &self,
        txn: &DatabaseTransaction,
        item_id: Uuid,
    ) -> Result<inventory_item::Model, ServiceError> {
        InventoryItemEntity::find_by_id(item_id)
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Inventory item {} referenced by a movement is missing",
                    item_id
                ))
            })
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send ledger event");
            }
        }
    }
}

fn validate_optional_price(price: Option<Decimal>) -> Result<(), ServiceError> {
    match price {
        Some(p) if p < Decimal::ZERO => Err(ServiceError::ValidationError(
            "Unit price must not be negative".to_string(),
        )),
        _ => Ok(()),
    }
}
