use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 urls 表
        manager
            .create_table(
                Table::create()
                    .table(Urls::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Urls::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Urls::ShortIdentifier)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Urls::Url).text().not_null())
                    .col(
                        ColumnDef::new(Urls::VisitorUuid)
                            .string_len(64)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Urls::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Urls::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Urls::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一访客的同一 URL 只能存在一条记录
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_urls_url_visitor_uuid")
                    .table(Urls::Table)
                    .col(Urls::Url)
                    .col(Urls::VisitorUuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_urls_short_identifier")
                    .table(Urls::Table)
                    .col(Urls::ShortIdentifier)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_urls_visitor_uuid")
                    .table(Urls::Table)
                    .col(Urls::VisitorUuid)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_urls_visitor_uuid").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_urls_short_identifier").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_urls_url_visitor_uuid").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Urls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Urls {
    Table,
    Id,
    ShortIdentifier,
    Url,
    VisitorUuid,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
