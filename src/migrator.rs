use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_catalog_tables::Migration),
            Box::new(m20240301_000002_create_request_tables::Migration),
            Box::new(m20240301_000003_create_ticket_tables::Migration),
        ]
    }
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    OrganizationId,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ShopItems {
    Table,
    Id,
    OrganizationId,
    CategoryId,
    Name,
    Description,
    ImageUrl,
    Stock,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Requests {
    Table,
    Id,
    OrganizationId,
    RequesterId,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ItemsInRequest {
    Table,
    Id,
    RequestId,
    ShopItemId,
    OrganizationId,
    Quantity,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Inventory {
    Table,
    Id,
    OwnerId,
    ShopItemId,
    ItemInRequestId,
    PurchasedAt,
    UpdatedAt,
    Status,
}

#[derive(DeriveIden)]
enum Tickets {
    Table,
    Id,
    OrganizationId,
    OwnerId,
    Title,
    Description,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TicketConversations {
    Table,
    Id,
    TicketId,
    AuthorId,
    Message,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TicketScreenshots {
    Table,
    Id,
    TicketId,
    ImageUrl,
    CreatedAt,
}

async fn create_index<T, C>(
    manager: &SchemaManager<'_>,
    name: &str,
    table: T,
    col: C,
) -> Result<(), DbErr>
where
    T: IntoIden + 'static,
    C: IntoIden,
{
    manager
        .create_index(
            Index::create()
                .if_not_exists()
                .name(name)
                .table(table)
                .col(col)
                .to_owned(),
        )
        .await
}

mod m20240301_000001_create_catalog_tables {
    use super::{create_index, Categories, ShopItems};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Categories::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Categories::OrganizationId).uuid().not_null())
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(
                            ColumnDef::new(Categories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShopItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ShopItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(ShopItems::OrganizationId).uuid().not_null())
                        .col(ColumnDef::new(ShopItems::CategoryId).uuid().null())
                        .col(ColumnDef::new(ShopItems::Name).string().not_null())
                        .col(ColumnDef::new(ShopItems::Description).text().null())
                        .col(ColumnDef::new(ShopItems::ImageUrl).string().null())
                        .col(
                            ColumnDef::new(ShopItems::Stock)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(ShopItems::Stock).gte(0)),
                        )
                        .col(
                            ColumnDef::new(ShopItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShopItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shop_items_category")
                                .from(ShopItems::Table, ShopItems::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_categories_organization_id",
                Categories::Table,
                Categories::OrganizationId,
            )
            .await?;
            create_index(
                manager,
                "idx_shop_items_organization_id",
                ShopItems::Table,
                ShopItems::OrganizationId,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShopItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000002_create_request_tables {
    use super::{create_index, Inventory, ItemsInRequest, Requests, ShopItems};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_request_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Requests::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Requests::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Requests::OrganizationId).uuid().not_null())
                        .col(ColumnDef::new(Requests::RequesterId).uuid().not_null())
                        .col(ColumnDef::new(Requests::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Requests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ItemsInRequest::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ItemsInRequest::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ItemsInRequest::RequestId).uuid().not_null())
                        .col(ColumnDef::new(ItemsInRequest::ShopItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(ItemsInRequest::OrganizationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ItemsInRequest::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(ItemsInRequest::Quantity).gt(0)),
                        )
                        .col(
                            ColumnDef::new(ItemsInRequest::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ItemsInRequest::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ItemsInRequest::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_in_request_request")
                                .from(ItemsInRequest::Table, ItemsInRequest::RequestId)
                                .to(Requests::Table, Requests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_in_request_shop_item")
                                .from(ItemsInRequest::Table, ItemsInRequest::ShopItemId)
                                .to(ShopItems::Table, ShopItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Inventory::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Inventory::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Inventory::OwnerId).uuid().not_null())
                        .col(ColumnDef::new(Inventory::ShopItemId).uuid().not_null())
                        .col(ColumnDef::new(Inventory::ItemInRequestId).uuid().null())
                        .col(
                            ColumnDef::new(Inventory::PurchasedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Inventory::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Inventory::Status).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_shop_item")
                                .from(Inventory::Table, Inventory::ShopItemId)
                                .to(ShopItems::Table, ShopItems::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_item_in_request")
                                .from(Inventory::Table, Inventory::ItemInRequestId)
                                .to(ItemsInRequest::Table, ItemsInRequest::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_requests_organization_id",
                Requests::Table,
                Requests::OrganizationId,
            )
            .await?;
            create_index(
                manager,
                "idx_requests_requester_id",
                Requests::Table,
                Requests::RequesterId,
            )
            .await?;
            create_index(
                manager,
                "idx_items_in_request_request_id",
                ItemsInRequest::Table,
                ItemsInRequest::RequestId,
            )
            .await?;
            create_index(
                manager,
                "idx_inventory_owner_id",
                Inventory::Table,
                Inventory::OwnerId,
            )
            .await?;
            create_index(
                manager,
                "idx_inventory_item_in_request_id",
                Inventory::Table,
                Inventory::ItemInRequestId,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Inventory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ItemsInRequest::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Requests::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000003_create_ticket_tables {
    use super::{create_index, TicketConversations, TicketScreenshots, Tickets};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_ticket_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tickets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tickets::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tickets::OrganizationId).uuid().not_null())
                        .col(ColumnDef::new(Tickets::OwnerId).uuid().not_null())
                        .col(ColumnDef::new(Tickets::Title).string().not_null())
                        .col(ColumnDef::new(Tickets::Description).text().not_null())
                        .col(ColumnDef::new(Tickets::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Tickets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tickets::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TicketConversations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TicketConversations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketConversations::TicketId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketConversations::AuthorId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketConversations::Message)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketConversations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_ticket_conversations_ticket")
                                .from(TicketConversations::Table, TicketConversations::TicketId)
                                .to(Tickets::Table, Tickets::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TicketScreenshots::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TicketScreenshots::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TicketScreenshots::TicketId).uuid().not_null())
                        .col(
                            ColumnDef::new(TicketScreenshots::ImageUrl)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketScreenshots::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_ticket_screenshots_ticket")
                                .from(TicketScreenshots::Table, TicketScreenshots::TicketId)
                                .to(Tickets::Table, Tickets::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_tickets_organization_id",
                Tickets::Table,
                Tickets::OrganizationId,
            )
            .await?;
            create_index(manager, "idx_tickets_owner_id", Tickets::Table, Tickets::OwnerId).await?;
            create_index(
                manager,
                "idx_ticket_conversations_ticket_id",
                TicketConversations::Table,
                TicketConversations::TicketId,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TicketScreenshots::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TicketConversations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Tickets::Table).to_owned())
                .await
        }
    }
}
