//! 活跃状态清扫任务
//!
//! 周期性地重算所有汇总行的 `days_since_last_activity` 和 `is_active_user`。
//! 清扫不修改 `updated_at`，也不触碰任何计数字段。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{DbErr, EntityTrait, ExprTrait, QueryFilter, QuerySelect, TransactionTrait};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::ActivityTracker;
use crate::storage::backend::retry;
use migration::entities::consumer_activity_summary::{Column, Entity};

/// 单条 UPDATE 中 IN 列表的最大长度
const SWEEP_CHUNK_SIZE: usize = 500;

/// 清扫报告
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: u64,
    pub active: u64,
    pub inactive: u64,
}

/// 距最后活动的整天数（向下取整，时钟回拨时为 0）
pub fn days_since(last_activity_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    Ord::max((now - last_activity_at).num_days(), 0)
}

impl ActivityTracker {
    /// 以当前时间执行一次清扫
    ///
    /// 失败时记录日志并返回 None。
    pub async fn update_activity_status(&self) -> Option<SweepReport> {
        self.update_activity_status_at(Utc::now()).await
    }

    /// 以给定的 `now` 执行一次清扫
    pub async fn update_activity_status_at(&self, now: DateTime<Utc>) -> Option<SweepReport> {
        let threshold = self.settings().inactive_after_days;
        let result = retry::with_retry(
            "update_activity_status",
            self.storage_retry_config(),
            || self.apply_sweep(now, threshold),
        )
        .await;

        match result {
            Ok(report) => {
                info!(
                    "Activity sweep completed: {} scanned, {} active, {} inactive",
                    report.scanned, report.active, report.inactive
                );
                Some(report)
            }
            Err(e) => {
                error!("Activity sweep failed: {}", e);
                None
            }
        }
    }

    async fn apply_sweep(&self, now: DateTime<Utc>, threshold: i64) -> Result<SweepReport, DbErr> {
        let txn = self.db().begin().await?;

        let rows: Vec<(i64, DateTime<Utc>)> = Entity::find()
            .select_only()
            .column(Column::ConsumerId)
            .column(Column::LastActivityAt)
            .into_tuple()
            .all(&txn)
            .await?;

        // 按天数分组，同组的行共用一条 UPDATE
        let mut by_days: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for (consumer_id, last_activity_at) in rows {
            by_days
                .entry(days_since(last_activity_at, now))
                .or_default()
                .push(consumer_id);
        }

        let mut report = SweepReport::default();
        for (days, consumer_ids) in &by_days {
            let is_active = *days <= threshold;
            let count = consumer_ids.len() as u64;
            report.scanned += count;
            if is_active {
                report.active += count;
            } else {
                report.inactive += count;
            }

            for chunk in consumer_ids.chunks(SWEEP_CHUNK_SIZE) {
                Entity::update_many()
                    .col_expr(Column::DaysSinceLastActivity, Expr::value(*days).into())
                    .col_expr(Column::IsActiveUser, Expr::value(is_active).into())
                    .filter(Expr::col(Column::ConsumerId).is_in(chunk.iter().copied()))
                    .exec(&txn)
                    .await?;
            }
            debug!(
                "Sweep: {} consumers at {} days (active: {})",
                count, days, is_active
            );
        }

        txn.commit().await?;
        Ok(report)
    }
}

/// 周期性清扫任务
pub struct StalenessSweepTask {
    tracker: Arc<ActivityTracker>,
    initial_delay: StdDuration,
    interval: StdDuration,
}

impl StalenessSweepTask {
    /// 从追踪器的配置中读取首次延迟和间隔
    pub fn new(tracker: Arc<ActivityTracker>) -> Self {
        let settings = tracker.settings();
        let initial_delay = StdDuration::from_secs(settings.sweep_initial_delay_secs);
        let interval = StdDuration::from_secs(Ord::max(settings.sweep_interval_hours, 1) * 60 * 60);
        Self {
            tracker,
            initial_delay,
            interval,
        }
    }

    pub async fn run_once(&self) -> Option<SweepReport> {
        self.tracker.update_activity_status().await
    }

    /// 启动后台清扫循环，调用方通过返回的句柄 abort
    pub fn spawn_background_task(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            "Activity sweep background task started (interval: {} s, initial delay: {} s)",
            self.interval.as_secs(),
            self.initial_delay.as_secs()
        );

        tokio::spawn(async move {
            tokio::time::sleep(self.initial_delay).await;

            loop {
                // 失败已在 update_activity_status 中记录，下个周期继续
                let _ = self.run_once().await;
                tokio::time::sleep(self.interval).await;
            }
        })
    }
}
