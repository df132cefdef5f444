use crate::{
    db::DbPool,
    entities::{
        inbound_movement::{self, Entity as InboundMovementEntity},
        inventory_item::{
            self, Entity as InventoryItemEntity, ItemCategory, ItemStatus,
            Model as InventoryItemModel,
        },
        outbound_movement::{self, Entity as OutboundMovementEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    PageParams, PaginatedResponse,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Request/Response types for the catalog service
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, message = "Item code is required"))]
    pub code: String,
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    pub category: ItemCategory,
    pub specification: Option<String>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    pub unit_price: Option<Decimal>,
    pub remarks: Option<String>,
    #[validate(range(min = 0, message = "Current quantity must not be negative"))]
    pub current_quantity: i32,
    #[validate(range(min = 0, message = "Safety quantity must not be negative"))]
    pub safety_quantity: i32,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, message = "Item code must not be empty"))]
    pub code: Option<String>,
    #[validate(length(min = 1, message = "Item name must not be empty"))]
    pub name: Option<String>,
    pub category: Option<ItemCategory>,
    pub specification: Option<String>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    pub unit_price: Option<Decimal>,
    pub remarks: Option<String>,
    #[validate(range(min = 0, message = "Safety quantity must not be negative"))]
    pub safety_quantity: Option<i32>,
    pub status: Option<ItemStatus>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ItemListFilter {
    /// Substring match against name, code and specification
    pub keyword: Option<String>,
    pub category: Option<ItemCategory>,
    /// Restrict to items with current_quantity <= safety_quantity
    pub low_stock_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub category: ItemCategory,
    pub specification: Option<String>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    pub unit_price: Option<Decimal>,
    pub remarks: Option<String>,
    pub current_quantity: i32,
    pub safety_quantity: i32,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<InventoryItemModel> for ItemResponse {
    fn from(model: InventoryItemModel) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            category: ItemCategory::from_str(&model.category).unwrap_or(ItemCategory::Other),
            specification: model.specification,
            unit: model.unit,
            location: model.location,
            manufacturer: model.manufacturer,
            unit_price: model.unit_price,
            remarks: model.remarks,
            current_quantity: model.current_quantity,
            safety_quantity: model.safety_quantity,
            status: ItemStatus::from_str(&model.status).unwrap_or(ItemStatus::Inactive),
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

/// Service owning the inventory item catalog.
///
/// `current_quantity` is initialized here but mutated only by the ledger and
/// stock-take services.
#[derive(Clone)]
pub struct InventoryCatalogService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl InventoryCatalogService {
    /// Creates a new catalog service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a new inventory item; rejects codes already used by a
    /// non-deleted item.
    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_item(
        &self,
        request: CreateItemRequest,
    ) -> Result<ItemResponse, ServiceError> {
        request.validate()?;
        validate_unit_price(request.unit_price)?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let item_id = Uuid::new_v4();

        // Early check for a readable message; the partial unique index on
        // code is what actually holds under concurrent creates.
        let duplicate = InventoryItemEntity::find()
            .filter(inventory_item::Column::Code.eq(request.code.clone()))
            .filter(inventory_item::Column::DeletedAt.is_null())
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, code = %request.code, "Failed to check code uniqueness");
                ServiceError::DatabaseError(e)
            })?;

        if duplicate.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Item code '{}' is already in use",
                request.code
            )));
        }

        let item = inventory_item::ActiveModel {
            id: Set(item_id),
            code: Set(request.code.clone()),
            name: Set(request.name),
            category: Set(request.category.to_string()),
            specification: Set(request.specification),
            unit: Set(request.unit),
            location: Set(request.location),
            manufacturer: Set(request.manufacturer),
            unit_price: Set(request.unit_price),
            remarks: Set(request.remarks),
            current_quantity: Set(request.current_quantity),
            safety_quantity: Set(request.safety_quantity),
            status: Set(ItemStatus::Active.to_string()),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        };

        let model = item.insert(db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                return ServiceError::ValidationError(format!(
                    "Item code '{}' is already in use",
                    request.code
                ));
            }
            error!(error = %e, item_id = %item_id, "Failed to create inventory item");
            ServiceError::DatabaseError(e)
        })?;

        info!(item_id = %item_id, code = %request.code, "Inventory item created");

        self.emit(Event::ItemCreated(item_id)).await;

        Ok(model.into())
    }

    /// Retrieves an item by id. Soft-deleted items remain addressable for
    /// audit; callers can inspect `deleted_at` on the response.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<ItemResponse, ServiceError> {
        let db = &*self.db_pool;

        let item = InventoryItemEntity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, item_id = %item_id, "Failed to fetch inventory item");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory item {} not found", item_id))
            })?;

        Ok(item.into())
    }

    /// Lists non-deleted items, newest first.
    #[instrument(skip(self, filter))]
    pub async fn list_items(
        &self,
        filter: ItemListFilter,
        page: PageParams,
    ) -> Result<PaginatedResponse<ItemResponse>, ServiceError> {
        let db = &*self.db_pool;
        let page = page.normalize();

        let mut query = InventoryItemEntity::find()
            .filter(inventory_item::Column::DeletedAt.is_null())
            .order_by_desc(inventory_item::Column::CreatedAt);

        if let Some(keyword) = &filter.keyword {
            query = query.filter(
                Condition::any()
                    .add(inventory_item::Column::Name.contains(keyword.as_str()))
                    .add(inventory_item::Column::Code.contains(keyword.as_str()))
                    .add(inventory_item::Column::Specification.contains(keyword.as_str())),
            );
        }

        if let Some(category) = filter.category {
            query = query.filter(inventory_item::Column::Category.eq(category.to_string()));
        }

        if filter.low_stock_only {
            query = query.filter(
                Expr::col(inventory_item::Column::CurrentQuantity)
                    .lte(Expr::col(inventory_item::Column::SafetyQuantity)),
            );
        }

        let paginator = query.paginate(db, page.page_size);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count inventory items");
            ServiceError::DatabaseError(e)
        })?;

        let items = paginator.fetch_page(page.page - 1).await.map_err(|e| {
            error!(error = %e, page = page.page, "Failed to fetch inventory items page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(PaginatedResponse::new(
            items.into_iter().map(Into::into).collect(),
            total,
            page,
        ))
    }

    /// Applies a partial update; a changed code is re-checked for uniqueness
    /// against all other non-deleted items.
    #[instrument(skip(self, request), fields(item_id = %item_id))]
    pub async fn update_item(
        &self,
        item_id: Uuid,
        request: UpdateItemRequest,
    ) -> Result<ItemResponse, ServiceError> {
        request.validate()?;
        validate_unit_price(request.unit_price)?;

        let db = &*self.db_pool;
        let now = Utc::now();

        let item = InventoryItemEntity::find_by_id(item_id)
            .filter(inventory_item::Column::DeletedAt.is_null())
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, item_id = %item_id, "Failed to fetch item for update");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory item {} not found", item_id))
            })?;

        if let Some(code) = &request.code {
            if *code != item.code {
                let duplicate = InventoryItemEntity::find()
                    .filter(inventory_item::Column::Code.eq(code.clone()))
                    .filter(inventory_item::Column::DeletedAt.is_null())
                    .filter(inventory_item::Column::Id.ne(item_id))
                    .one(db)
                    .await
                    .map_err(ServiceError::DatabaseError)?;

                if duplicate.is_some() {
                    return Err(ServiceError::ValidationError(format!(
                        "Item code '{}' is already in use",
                        code
                    )));
                }
            }
        }

        let mut active: inventory_item::ActiveModel = item.into();
        if let Some(code) = request.code {
            active.code = Set(code);
        }
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(category) = request.category {
            active.category = Set(category.to_string());
        }
        if let Some(specification) = request.specification {
            active.specification = Set(Some(specification));
        }
        if let Some(unit) = request.unit {
            active.unit = Set(Some(unit));
        }
        if let Some(location) = request.location {
            active.location = Set(Some(location));
        }
        if let Some(manufacturer) = request.manufacturer {
            active.manufacturer = Set(Some(manufacturer));
        }
        if let Some(unit_price) = request.unit_price {
            active.unit_price = Set(Some(unit_price));
        }
        if let Some(remarks) = request.remarks {
            active.remarks = Set(Some(remarks));
        }
        if let Some(safety_quantity) = request.safety_quantity {
            active.safety_quantity = Set(safety_quantity);
        }
        if let Some(status) = request.status {
            active.status = Set(status.to_string());
        }
        active.updated_at = Set(Some(now));

        let updated = active.update(db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                return ServiceError::ValidationError("Item code is already in use".to_string());
            }
            error!(error = %e, item_id = %item_id, "Failed to update inventory item");
            ServiceError::DatabaseError(e)
        })?;

        info!(item_id = %item_id, "Inventory item updated");

        self.emit(Event::ItemUpdated(item_id)).await;

        Ok(updated.into())
    }

    /// Tombstones an item. Refused while any non-deleted movement still
    /// references it, so ledger history always points at a live catalog row.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn soft_delete_item(&self, item_id: Uuid) -> Result<ItemResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, item_id = %item_id, "Failed to start delete transaction");
            ServiceError::DatabaseError(e)
        })?;

        let item = InventoryItemEntity::find_by_id(item_id)
            .filter(inventory_item::Column::DeletedAt.is_null())
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory item {} not found", item_id))
            })?;

        let inbound_refs = InboundMovementEntity::find()
            .filter(inbound_movement::Column::ItemId.eq(item_id))
            .filter(inbound_movement::Column::DeletedAt.is_null())
            .count(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let outbound_refs = OutboundMovementEntity::find()
            .filter(outbound_movement::Column::ItemId.eq(item_id))
            .filter(outbound_movement::Column::DeletedAt.is_null())
            .count(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if inbound_refs + outbound_refs > 0 {
            warn!(
                item_id = %item_id,
                inbound_refs,
                outbound_refs,
                "Refusing to delete item with movement history"
            );
            return Err(ServiceError::Conflict(format!(
                "Inventory item {} has {} active movement(s) and cannot be deleted",
                item_id,
                inbound_refs + outbound_refs
            )));
        }

        let mut active: inventory_item::ActiveModel = item.into();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(Some(now));

        let deleted = active.update(&txn).await.map_err(|e| {
            error!(error = %e, item_id = %item_id, "Failed to delete inventory item");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, item_id = %item_id, "Failed to commit delete transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(item_id = %item_id, "Inventory item soft-deleted");

        self.emit(Event::ItemDeleted(item_id)).await;

        Ok(deleted.into())
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send catalog event");
            }
        }
    }
}

fn validate_unit_price(unit_price: Option<Decimal>) -> Result<(), ServiceError> {
    match unit_price {
        Some(price) if price < Decimal::ZERO => Err(ServiceError::ValidationError(
            "Unit price must not be negative".to_string(),
        )),
        _ => Ok(()),
    }
}
