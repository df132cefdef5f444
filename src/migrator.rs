use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_inventory_items_table::Migration),
            Box::new(m20240101_000002_create_movement_tables::Migration),
            Box::new(m20240101_000003_create_stock_take_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_inventory_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_inventory_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Code).string().not_null())
                        .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::Category)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Specification).string().null())
                        .col(ColumnDef::new(InventoryItems::Unit).string().null())
                        .col(ColumnDef::new(InventoryItems::Location).string().null())
                        .col(ColumnDef::new(InventoryItems::Manufacturer).string().null())
                        .col(
                            ColumnDef::new(InventoryItems::UnitPrice)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Remarks).string().null())
                        .col(
                            ColumnDef::new(InventoryItems::CurrentQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::SafetyQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(InventoryItems::Status).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::UpdatedAt).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(InventoryItems::DeletedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await?;

            // Unique among live rows only; tombstoned rows may share a code.
            // Raw SQL because the index builder has no partial-index support.
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS idx_inventory_items_code \
                     ON inventory_items (code) WHERE deleted_at IS NULL",
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_items_category")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::Category)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_items_created_at")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum InventoryItems {
        Table,
        Id,
        Code,
        Name,
        Category,
        Specification,
        Unit,
        Location,
        Manufacturer,
        UnitPrice,
        Remarks,
        CurrentQuantity,
        SafetyQuantity,
        Status,
        CreatedAt,
        UpdatedAt,
        DeletedAt,
    }
}

mod m20240101_000002_create_movement_tables {

    use sea_orm_migration::prelude::*;

    use super::m20240101_000001_create_inventory_items_table::InventoryItems;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_movement_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InboundMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InboundMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InboundMovements::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(InboundMovements::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InboundMovements::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InboundMovements::UnitPrice)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InboundMovements::TotalPrice)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(InboundMovements::Supplier).string().null())
                        .col(ColumnDef::new(InboundMovements::BatchNumber).string().null())
                        .col(
                            ColumnDef::new(InboundMovements::ProductionDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InboundMovements::ExpirationDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InboundMovements::Operator)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InboundMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InboundMovements::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InboundMovements::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inbound_movements_item_id")
                                .from(InboundMovements::Table, InboundMovements::ItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inbound_movements_item_id")
                        .table(InboundMovements::Table)
                        .col(InboundMovements::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inbound_movements_created_at")
                        .table(InboundMovements::Table)
                        .col(InboundMovements::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OutboundMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OutboundMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutboundMovements::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(OutboundMovements::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundMovements::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundMovements::BatchNumber)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(OutboundMovements::Purpose).string().null())
                        .col(ColumnDef::new(OutboundMovements::PatientRef).string().null())
                        .col(
                            ColumnDef::new(OutboundMovements::MedicalRecordRef)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(OutboundMovements::Operator)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundMovements::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(OutboundMovements::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_outbound_movements_item_id")
                                .from(OutboundMovements::Table, OutboundMovements::ItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_outbound_movements_item_id")
                        .table(OutboundMovements::Table)
                        .col(OutboundMovements::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_outbound_movements_created_at")
                        .table(OutboundMovements::Table)
                        .col(OutboundMovements::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OutboundMovements::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InboundMovements::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum InboundMovements {
        Table,
        Id,
        ItemId,
        Quantity,
        MovementType,
        UnitPrice,
        TotalPrice,
        Supplier,
        BatchNumber,
        ProductionDate,
        ExpirationDate,
        Operator,
        CreatedAt,
        UpdatedAt,
        DeletedAt,
    }

    #[derive(Iden)]
    pub enum OutboundMovements {
        Table,
        Id,
        ItemId,
        Quantity,
        MovementType,
        BatchNumber,
        Purpose,
        PatientRef,
        MedicalRecordRef,
        Operator,
        CreatedAt,
        UpdatedAt,
        DeletedAt,
    }
}

mod m20240101_000003_create_stock_take_tables {

    use sea_orm_migration::prelude::*;

    use super::m20240101_000001_create_inventory_items_table::InventoryItems;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_stock_take_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockTakes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTakes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTakes::BatchNumber).string().null())
                        .col(ColumnDef::new(StockTakes::StockTakeDate).date().null())
                        .col(ColumnDef::new(StockTakes::Operator).string().not_null())
                        .col(ColumnDef::new(StockTakes::Remarks).string().null())
                        .col(ColumnDef::new(StockTakes::ResultSummary).text().null())
                        .col(
                            ColumnDef::new(StockTakes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTakes::UpdatedAt).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(StockTakes::DeletedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_takes_created_at")
                        .table(StockTakes::Table)
                        .col(StockTakes::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockTakeItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTakeItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTakeItems::StockTakeId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTakeItems::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTakeItems::LineNumber)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTakeItems::SystemQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTakeItems::ActualQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTakeItems::Difference)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTakeItems::Reason).string().null())
                        .col(
                            ColumnDef::new(StockTakeItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTakeItems::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_take_items_stock_take_id")
                                .from(StockTakeItems::Table, StockTakeItems::StockTakeId)
                                .to(StockTakes::Table, StockTakes::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_take_items_item_id")
                                .from(StockTakeItems::Table, StockTakeItems::ItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_take_items_stock_take_id")
                        .table(StockTakeItems::Table)
                        .col(StockTakeItems::StockTakeId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_take_items_item_id")
                        .table(StockTakeItems::Table)
                        .col(StockTakeItems::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTakeItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockTakes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum StockTakes {
        Table,
        Id,
        BatchNumber,
        StockTakeDate,
        Operator,
        Remarks,
        ResultSummary,
        CreatedAt,
        UpdatedAt,
        DeletedAt,
    }

    #[derive(Iden)]
    pub enum StockTakeItems {
        Table,
        Id,
        StockTakeId,
        ItemId,
        LineNumber,
        SystemQuantity,
        ActualQuantity,
        Difference,
        Reason,
        CreatedAt,
        DeletedAt,
    }
}
