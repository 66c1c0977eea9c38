use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 short_urls 表，original_url 上的唯一约束负责去重
        manager
            .create_table(
                Table::create()
                    .table(ShortUrl::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortUrl::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ShortUrl::OriginalUrl)
                            .string_len(2048)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ShortUrl::ShortKey).string_len(255).not_null())
                    .col(ColumnDef::new(ShortUrl::OwnerId).big_integer().null())
                    .col(
                        ColumnDef::new(ShortUrl::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 owners 表
        manager
            .create_table(
                Table::create()
                    .table(Owner::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Owner::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_urls_short_key")
                    .table(ShortUrl::Table)
                    .col(ShortUrl::ShortKey)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_urls_owner_id")
                    .table(ShortUrl::Table)
                    .col(ShortUrl::OwnerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_short_urls_owner_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_short_urls_short_key").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Owner::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ShortUrl::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ShortUrl {
    #[sea_orm(iden = "short_urls")]
    Table,
    Id,
    OriginalUrl,
    ShortKey,
    OwnerId,
    Deleted,
}

#[derive(DeriveIden)]
enum Owner {
    #[sea_orm(iden = "owners")]
    Table,
    Id,
}
