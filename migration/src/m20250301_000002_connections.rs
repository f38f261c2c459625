//! 农户-消费者连接表
//!
//! 该表归连接请求服务所有，这里仅在缺失时创建（IF NOT EXISTS），
//! 聚合器只读取它来统计已连接农户数。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Connections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Connections::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Connections::ConsumerId).big_integer().not_null())
                    .col(ColumnDef::new(Connections::FarmerId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Connections::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Connections::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_connections_consumer_status")
                    .table(Connections::Table)
                    .col(Connections::ConsumerId)
                    .col(Connections::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_connections_consumer_status")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Connections::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Connections {
    Table,
    Id,
    ConsumerId,
    FarmerId,
    Status,
    CreatedAt,
}
