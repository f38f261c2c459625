//! 消费者活跃度汇总表迁移
//!
//! 每个消费者一行，所有计数器默认 0，由活跃度聚合器独占写入。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ConsumerActivitySummary::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::ConsumerId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(counter(ConsumerActivitySummary::TotalRequestsSent))
                    .col(counter(ConsumerActivitySummary::AcceptedRequests))
                    .col(counter(ConsumerActivitySummary::RejectedRequests))
                    .col(counter(ConsumerActivitySummary::PendingRequests))
                    .col(counter(ConsumerActivitySummary::ActiveConnections))
                    .col(counter(ConsumerActivitySummary::TotalFarmersConnected))
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::RequestSuccessRate)
                            .double()
                            .null(),
                    )
                    .col(counter(ConsumerActivitySummary::TotalOrdersPlaced))
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::TotalSpent)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::AverageOrdersPerConnection)
                            .double()
                            .null(),
                    )
                    .col(counter(ConsumerActivitySummary::TotalReviewsGiven))
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::UserTier)
                            .string_len(16)
                            .not_null()
                            .default("regular"),
                    )
                    .col(counter(ConsumerActivitySummary::DaysSinceLastActivity))
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::IsActiveUser)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::LastRequestSentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::LastOrderPlacedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::LastReviewGivenAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::LastActivityAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConsumerActivitySummary::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 清扫任务按 last_activity_at 扫描
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_last_activity")
                    .table(ConsumerActivitySummary::Table)
                    .col(ConsumerActivitySummary::LastActivityAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_tier")
                    .table(ConsumerActivitySummary::Table)
                    .col(ConsumerActivitySummary::UserTier)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_activity_tier").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_activity_last_activity").to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(ConsumerActivitySummary::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

/// 非负计数列：BIGINT NOT NULL DEFAULT 0
fn counter(col: ConsumerActivitySummary) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

#[derive(DeriveIden)]
enum ConsumerActivitySummary {
    #[sea_orm(iden = "consumer_activity_summary")]
    Table,
    ConsumerId,
    TotalRequestsSent,
    AcceptedRequests,
    RejectedRequests,
    PendingRequests,
    ActiveConnections,
    TotalFarmersConnected,
    RequestSuccessRate,
    TotalOrdersPlaced,
    TotalSpent,
    AverageOrdersPerConnection,
    TotalReviewsGiven,
    UserTier,
    DaysSinceLastActivity,
    IsActiveUser,
    LastRequestSentAt,
    LastOrderPlacedAt,
    LastReviewGivenAt,
    LastActivityAt,
    CreatedAt,
    UpdatedAt,
}
