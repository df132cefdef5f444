use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Catalog categories for clinical supplies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Material,
    Medicine,
    Equipment,
    Tool,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Inactive,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Unique among non-deleted items; tombstoned rows may share a code
    pub code: String,
    pub name: String,
    pub category: String,
    pub specification: Option<String>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    /// Reference price only; movement totals are derived from movement prices
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub unit_price: Option<Decimal>,
    pub remarks: Option<String>,
    /// Live quantity counter, mutated only by the ledger and stock-take services
    pub current_quantity: i32,
    /// Reorder threshold for low-stock reporting
    pub safety_quantity: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inbound_movement::Entity")]
    InboundMovements,
    #[sea_orm(has_many = "super::outbound_movement::Entity")]
    OutboundMovements,
    #[sea_orm(has_many = "super::stock_take_item::Entity")]
    StockTakeItems,
}

impl Related<super::inbound_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InboundMovements.def()
    }
}

impl Related<super::outbound_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OutboundMovements.def()
    }
}

impl Related<super::stock_take_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTakeItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
