use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_takes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub batch_number: Option<String>,
    pub stock_take_date: Option<Date>,
    pub operator: String,
    pub remarks: Option<String>,
    /// JSON-serialized reconciliation summary, written once all lines settle
    pub result_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_take_item::Entity")]
    StockTakeItems,
}

impl Related<super::stock_take_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTakeItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
