//! 活跃度追踪器
//!
//! 每个操作在一个事务中完成：原子计数更新（`col = col + delta`，由数据库端执行），
//! 重读该行，用 [`recompute_derived`] 重算派生字段后写回。
//! 错误在这里被截获、记录，并转换为 [`ActivityOutcome::Failed`]。

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict, SimpleExpr};
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, ExprTrait,
    PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use tracing::{debug, error, info, warn};

use super::derived::{CounterSnapshot, recompute_derived};
use super::tier::{UserTier, classify_tier};
use super::{ActivityOutcome, ActivityRecorder, ConsumerAnalytics, SkipReason};
use crate::config::ActivityConfig;
use crate::storage::SeaOrmStorage;
use crate::storage::backend::retry;
use migration::entities::consumer_activity_summary::{self, Column, Entity};
use migration::entities::farmer_connection;

pub struct ActivityTracker {
    storage: Arc<SeaOrmStorage>,
    settings: ActivityConfig,
}

impl ActivityTracker {
    pub fn new(storage: Arc<SeaOrmStorage>, settings: ActivityConfig) -> Self {
        Self { storage, settings }
    }

    pub fn settings(&self) -> &ActivityConfig {
        &self.settings
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        self.storage.get_db()
    }

    pub(crate) fn storage_retry_config(&self) -> retry::RetryConfig {
        self.storage.retry_config()
    }

    /// 确保汇总行存在；已存在时不做任何修改
    pub async fn initialize_activity(&self, consumer_id: i64) -> ActivityOutcome {
        let now = Utc::now();
        self.run("initialize_activity", consumer_id, || {
            self.apply_initialize(consumer_id, now)
        })
        .await
    }

    /// 发送连接请求：不存在则以 1 为初值创建，否则 total/pending 各 +1
    pub async fn track_request_sent(&self, consumer_id: i64, farmer_id: i64) -> ActivityOutcome {
        let now = Utc::now();
        debug!(
            "Tracking request sent: consumer {} -> farmer {}",
            consumer_id, farmer_id
        );
        self.run("track_request_sent", consumer_id, || {
            self.apply_request_sent(consumer_id, now)
        })
        .await
    }

    /// 请求被接受：accepted/active_connections +1，pending -1，刷新已连接农户数
    pub async fn track_request_accepted(
        &self,
        consumer_id: i64,
        farmer_id: i64,
    ) -> ActivityOutcome {
        let now = Utc::now();
        debug!(
            "Tracking request accepted: consumer {} <- farmer {}",
            consumer_id, farmer_id
        );
        self.run("track_request_accepted", consumer_id, || {
            self.apply_request_resolved(consumer_id, RequestResolution::Accepted, now)
        })
        .await
    }

    /// 请求被拒绝：rejected +1，pending -1
    pub async fn track_request_rejected(
        &self,
        consumer_id: i64,
        farmer_id: i64,
    ) -> ActivityOutcome {
        let now = Utc::now();
        debug!(
            "Tracking request rejected: consumer {} <- farmer {}",
            consumer_id, farmer_id
        );
        self.run("track_request_rejected", consumer_id, || {
            self.apply_request_resolved(consumer_id, RequestResolution::Rejected, now)
        })
        .await
    }

    /// 下单：订单数 +1，累计消费额（缺失或非有限金额按 0 计，负数照常累加并告警）
    pub async fn track_order_placed(
        &self,
        consumer_id: i64,
        order_amount: Option<f64>,
    ) -> ActivityOutcome {
        let now = Utc::now();
        let amount = normalize_order_amount(consumer_id, order_amount);
        self.run("track_order_placed", consumer_id, || {
            self.apply_order_placed(consumer_id, amount, now)
        })
        .await
    }

    pub async fn track_review_given(&self, consumer_id: i64) -> ActivityOutcome {
        let now = Utc::now();
        self.run("track_review_given", consumer_id, || {
            self.apply_review_given(consumer_id, now)
        })
        .await
    }

    /// 重新计算用户等级，由调用方决定何时触发
    pub async fn update_user_tier(&self, consumer_id: i64) -> ActivityOutcome {
        let now = Utc::now();
        self.run("update_user_tier", consumer_id, || {
            self.apply_user_tier(consumer_id, now)
        })
        .await
    }

    /// 读取单个消费者的分析数据
    ///
    /// 行不存在或读取失败都返回 None；失败会记录日志。
    pub async fn get_consumer_analytics(&self, consumer_id: i64) -> Option<ConsumerAnalytics> {
        match find_summary(self.db(), consumer_id).await {
            Ok(row) => row.map(ConsumerAnalytics::from),
            Err(e) => {
                error!(
                    "Failed to load activity analytics for consumer {}: {}",
                    consumer_id, e
                );
                None
            }
        }
    }

    // ============ 内部实现 ============

    async fn run<F, Fut>(&self, operation: &str, consumer_id: i64, op: F) -> ActivityOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ActivityOutcome, DbErr>>,
    {
        match retry::with_retry(operation, self.storage.retry_config(), op).await {
            Ok(ActivityOutcome::Skipped(reason)) => {
                warn!(
                    "Activity '{}' skipped for consumer {}: {}",
                    operation, consumer_id, reason
                );
                ActivityOutcome::Skipped(reason)
            }
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "Activity '{}' failed for consumer {}: {}",
                    operation, consumer_id, e
                );
                ActivityOutcome::Failed(e.to_string())
            }
        }
    }

    async fn apply_initialize(
        &self,
        consumer_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ActivityOutcome, DbErr> {
        let inserted = Entity::insert(new_summary(consumer_id, now))
            .on_conflict(OnConflict::column(Column::ConsumerId).do_nothing().to_owned())
            .exec_without_returning(self.db())
            .await?;

        if inserted > 0 {
            debug!("Activity summary created for consumer {}", consumer_id);
        }
        Ok(ActivityOutcome::Recorded)
    }

    async fn apply_request_sent(
        &self,
        consumer_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ActivityOutcome, DbErr> {
        let mut seed = new_summary(consumer_id, now);
        seed.total_requests_sent = Set(1);
        seed.pending_requests = Set(1);
        seed.last_request_sent_at = Set(Some(now));

        // 冲突时引用现有行的值（带表名限定，兼容 PostgreSQL）
        let on_conflict = OnConflict::column(Column::ConsumerId)
            .value(
                Column::TotalRequestsSent,
                Expr::col((Entity, Column::TotalRequestsSent)).add(1),
            )
            .value(
                Column::PendingRequests,
                Expr::col((Entity, Column::PendingRequests)).add(1),
            )
            .update_columns([
                Column::LastRequestSentAt,
                Column::LastActivityAt,
                Column::UpdatedAt,
            ])
            .to_owned();

        let txn = self.db().begin().await?;
        Entity::insert(seed)
            .on_conflict(on_conflict)
            .exec_without_returning(&txn)
            .await?;
        refresh_derived(&txn, consumer_id, None).await?;
        txn.commit().await?;

        Ok(ActivityOutcome::Recorded)
    }

    async fn apply_request_resolved(
        &self,
        consumer_id: i64,
        resolution: RequestResolution,
        now: DateTime<Utc>,
    ) -> Result<ActivityOutcome, DbErr> {
        let txn = self.db().begin().await?;

        // 事务的第一条语句必须是写入：先读后写的事务在 SQLite 上升级写锁时会直接 BUSY
        let touched = Entity::update_many()
            .col_expr(Column::LastActivityAt, Expr::value(now).into())
            .col_expr(Column::UpdatedAt, Expr::value(now).into())
            .filter(Expr::col(Column::ConsumerId).eq(consumer_id))
            .exec(&txn)
            .await?;
        if touched.rows_affected == 0 {
            return Ok(ActivityOutcome::Skipped(SkipReason::SummaryMissing));
        }

        // 已持有写锁，读到的 pending 即递减前的值
        let row = find_summary(&txn, consumer_id).await?.ok_or_else(|| {
            DbErr::RecordNotFound(format!("consumer_activity_summary {}", consumer_id))
        })?;
        self.check_pending(&row, resolution);

        let mut update = Entity::update_many()
            .col_expr(Column::PendingRequests, self.pending_decrement());

        update = match resolution {
            RequestResolution::Accepted => update
                .col_expr(
                    Column::AcceptedRequests,
                    Expr::col(Column::AcceptedRequests).add(1).into(),
                )
                .col_expr(
                    Column::ActiveConnections,
                    Expr::col(Column::ActiveConnections).add(1).into(),
                ),
            RequestResolution::Rejected => update.col_expr(
                Column::RejectedRequests,
                Expr::col(Column::RejectedRequests).add(1).into(),
            ),
        };

        update
            .filter(Expr::col(Column::ConsumerId).eq(consumer_id))
            .exec(&txn)
            .await?;

        // 已连接农户数是接受事件发生时的快照
        let farmers_connected = match resolution {
            RequestResolution::Accepted => Some(count_active_farmers(&txn, consumer_id).await?),
            RequestResolution::Rejected => None,
        };
        refresh_derived(&txn, consumer_id, farmers_connected).await?;
        txn.commit().await?;

        Ok(ActivityOutcome::Recorded)
    }

    async fn apply_order_placed(
        &self,
        consumer_id: i64,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<ActivityOutcome, DbErr> {
        let txn = self.db().begin().await?;

        let result = Entity::update_many()
            .col_expr(
                Column::TotalOrdersPlaced,
                Expr::col(Column::TotalOrdersPlaced).add(1).into(),
            )
            .col_expr(
                Column::TotalSpent,
                Expr::col(Column::TotalSpent).add(amount).into(),
            )
            .col_expr(Column::LastOrderPlacedAt, Expr::value(now).into())
            .col_expr(Column::LastActivityAt, Expr::value(now).into())
            .col_expr(Column::UpdatedAt, Expr::value(now).into())
            .filter(Expr::col(Column::ConsumerId).eq(consumer_id))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(ActivityOutcome::Skipped(SkipReason::SummaryMissing));
        }

        refresh_derived(&txn, consumer_id, None).await?;
        txn.commit().await?;

        Ok(ActivityOutcome::Recorded)
    }

    async fn apply_review_given(
        &self,
        consumer_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ActivityOutcome, DbErr> {
        let txn = self.db().begin().await?;

        let result = Entity::update_many()
            .col_expr(
                Column::TotalReviewsGiven,
                Expr::col(Column::TotalReviewsGiven).add(1).into(),
            )
            .col_expr(Column::LastReviewGivenAt, Expr::value(now).into())
            .col_expr(Column::LastActivityAt, Expr::value(now).into())
            .col_expr(Column::UpdatedAt, Expr::value(now).into())
            .filter(Expr::col(Column::ConsumerId).eq(consumer_id))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(ActivityOutcome::Skipped(SkipReason::SummaryMissing));
        }

        refresh_derived(&txn, consumer_id, None).await?;
        txn.commit().await?;

        Ok(ActivityOutcome::Recorded)
    }

    async fn apply_user_tier(
        &self,
        consumer_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ActivityOutcome, DbErr> {
        let Some(row) = find_summary(self.db(), consumer_id).await? else {
            return Ok(ActivityOutcome::Skipped(SkipReason::SummaryMissing));
        };

        let tier = classify_tier(
            row.total_orders_placed,
            row.total_spent,
            row.request_success_rate,
        );
        if row.user_tier != tier.as_ref() {
            info!(
                "Consumer {} tier changed: {} -> {}",
                consumer_id, row.user_tier, tier
            );
        }

        Entity::update_many()
            .col_expr(Column::UserTier, Expr::value(tier.to_string()).into())
            .col_expr(Column::UpdatedAt, Expr::value(now).into())
            .filter(Expr::col(Column::ConsumerId).eq(consumer_id))
            .exec(self.db())
            .await?;

        Ok(ActivityOutcome::Recorded)
    }

    /// pending_requests - 1；开启 clamp_pending 时下限为 0
    fn pending_decrement(&self) -> SimpleExpr {
        if self.settings.clamp_pending {
            Expr::case(
                Expr::col(Column::PendingRequests).gt(0),
                Expr::col(Column::PendingRequests).sub(1),
            )
            .finally(Expr::val(0i64))
            .into()
        } else {
            Expr::col(Column::PendingRequests).sub(1).into()
        }
    }

    fn check_pending(&self, row: &consumer_activity_summary::Model, resolution: RequestResolution) {
        if row.pending_requests > 0 {
            return;
        }
        if self.settings.clamp_pending {
            warn!(
                "Inconsistent activity for consumer {}: request {} with pending_requests = {}; clamping at 0",
                row.consumer_id, resolution, row.pending_requests
            );
        } else {
            warn!(
                "Inconsistent activity for consumer {}: request {} with pending_requests = {}; counter will go negative",
                row.consumer_id, resolution, row.pending_requests
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestResolution {
    Accepted,
    Rejected,
}

impl std::fmt::Display for RequestResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestResolution::Accepted => write!(f, "accepted"),
            RequestResolution::Rejected => write!(f, "rejected"),
        }
    }
}

/// 新汇总行：计数全部为 0，时间戳为 now
fn new_summary(consumer_id: i64, now: DateTime<Utc>) -> consumer_activity_summary::ActiveModel {
    consumer_activity_summary::ActiveModel {
        consumer_id: Set(consumer_id),
        total_requests_sent: Set(0),
        accepted_requests: Set(0),
        rejected_requests: Set(0),
        pending_requests: Set(0),
        active_connections: Set(0),
        total_farmers_connected: Set(0),
        request_success_rate: Set(None),
        total_orders_placed: Set(0),
        total_spent: Set(0.0),
        average_orders_per_connection: Set(None),
        total_reviews_given: Set(0),
        user_tier: Set(UserTier::Regular.to_string()),
        days_since_last_activity: Set(0),
        is_active_user: Set(true),
        last_request_sent_at: Set(None),
        last_order_placed_at: Set(None),
        last_review_given_at: Set(None),
        last_activity_at: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

fn normalize_order_amount(consumer_id: i64, order_amount: Option<f64>) -> f64 {
    match order_amount {
        Some(amount) if amount.is_finite() => {
            if amount < 0.0 {
                warn!(
                    "Negative order amount {} for consumer {}, total_spent will decrease",
                    amount, consumer_id
                );
            }
            amount
        }
        Some(amount) => {
            warn!(
                "Ignoring non-finite order amount {} for consumer {}",
                amount, consumer_id
            );
            0.0
        }
        None => 0.0,
    }
}

async fn find_summary<C: ConnectionTrait>(
    conn: &C,
    consumer_id: i64,
) -> Result<Option<consumer_activity_summary::Model>, DbErr> {
    Entity::find_by_id(consumer_id).one(conn).await
}

/// 该消费者当前 active 状态连接的不同农户数
async fn count_active_farmers<C: ConnectionTrait>(conn: &C, consumer_id: i64) -> Result<i64, DbErr> {
    let count = farmer_connection::Entity::find()
        .select_only()
        .column(farmer_connection::Column::FarmerId)
        .distinct()
        .filter(Expr::col(farmer_connection::Column::ConsumerId).eq(consumer_id))
        .filter(Expr::col(farmer_connection::Column::Status).eq(farmer_connection::STATUS_ACTIVE))
        .count(conn)
        .await?;
    Ok(count as i64)
}

/// 从当前计数重算派生字段并写回
async fn refresh_derived<C: ConnectionTrait>(
    conn: &C,
    consumer_id: i64,
    farmers_connected: Option<i64>,
) -> Result<(), DbErr> {
    let row = find_summary(conn, consumer_id).await?.ok_or_else(|| {
        DbErr::RecordNotFound(format!("consumer_activity_summary {}", consumer_id))
    })?;
    let derived = recompute_derived(CounterSnapshot::from(&row));

    let mut update = Entity::update_many()
        .col_expr(
            Column::RequestSuccessRate,
            Expr::value(derived.request_success_rate).into(),
        )
        .col_expr(
            Column::AverageOrdersPerConnection,
            Expr::value(derived.average_orders_per_connection).into(),
        );
    if let Some(farmers) = farmers_connected {
        update = update.col_expr(Column::TotalFarmersConnected, Expr::value(farmers).into());
    }

    update
        .filter(Expr::col(Column::ConsumerId).eq(consumer_id))
        .exec(conn)
        .await?;
    Ok(())
}

#[async_trait::async_trait]
impl ActivityRecorder for ActivityTracker {
    async fn initialize_activity(&self, consumer_id: i64) -> ActivityOutcome {
        ActivityTracker::initialize_activity(self, consumer_id).await
    }

    async fn track_request_sent(&self, consumer_id: i64, farmer_id: i64) -> ActivityOutcome {
        ActivityTracker::track_request_sent(self, consumer_id, farmer_id).await
    }

    async fn track_request_accepted(&self, consumer_id: i64, farmer_id: i64) -> ActivityOutcome {
        ActivityTracker::track_request_accepted(self, consumer_id, farmer_id).await
    }

    async fn track_request_rejected(&self, consumer_id: i64, farmer_id: i64) -> ActivityOutcome {
        ActivityTracker::track_request_rejected(self, consumer_id, farmer_id).await
    }

    async fn track_order_placed(
        &self,
        consumer_id: i64,
        order_amount: Option<f64>,
    ) -> ActivityOutcome {
        ActivityTracker::track_order_placed(self, consumer_id, order_amount).await
    }

    async fn track_review_given(&self, consumer_id: i64) -> ActivityOutcome {
        ActivityTracker::track_review_given(self, consumer_id).await
    }
}
