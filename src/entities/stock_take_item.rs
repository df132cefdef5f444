use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_take_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub stock_take_id: Uuid,
    pub item_id: Uuid,
    /// Preserves input order within the batch
    pub line_number: i32,
    /// The item's current_quantity captured at reconciliation time
    pub system_quantity: i32,
    pub actual_quantity: i32,
    /// actual_quantity - system_quantity
    pub difference: i32,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_take::Entity",
        from = "Column::StockTakeId",
        to = "super::stock_take::Column::Id"
    )]
    StockTake,
    #[sea_orm(
        belongs_to = "super::inventory_item::Entity",
        from = "Column::ItemId",
        to = "super::inventory_item::Column::Id"
    )]
    InventoryItem,
}

impl Related<super::stock_take::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTake.def()
    }
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
